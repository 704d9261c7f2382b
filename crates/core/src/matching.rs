use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::partner::{clamp_compatibility, normalize_label, Partner};

pub const FOCUS_BONUS: i64 = 1;
pub const DEFAULT_MAX_RESULTS: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartnerCriteria {
    pub project_focus: String,
    pub required_countries: Vec<String>,
    pub expertise_areas: Vec<String>,
    pub max_results: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMetadata {
    pub total_found: usize,
    pub countries_covered: Vec<String>,
    pub search_focus: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerMatches {
    pub potential_partners: Vec<Partner>,
    pub search_metadata: SearchMetadata,
}

/// Filters the partner catalog and ranks what is left.
///
/// Country filtering applies only when an allow-list is given; expertise
/// filtering only when areas are requested. A partner with an expertise area
/// matching the project focus word for word gets a fixed bonus on its stored
/// score. Ties break on
/// name so identical inputs always produce the same order.
pub fn rank_partners(catalog: &[Partner], criteria: &PartnerCriteria) -> PartnerMatches {
    let countries: BTreeSet<String> =
        criteria.required_countries.iter().map(|country| normalize_label(country)).collect();

    let mut ranked: Vec<Partner> = catalog
        .iter()
        .filter(|partner| countries.is_empty() || countries.contains(&normalize_label(&partner.country)))
        .filter(|partner| {
            criteria.expertise_areas.is_empty()
                || criteria.expertise_areas.iter().any(|area| partner.has_expertise(area))
        })
        .map(|partner| {
            let mut scored = partner.clone();
            let bonus =
                if partner.matches_focus(&criteria.project_focus) { FOCUS_BONUS } else { 0 };
            scored.compatibility_score =
                clamp_compatibility(i64::from(partner.compatibility_score) + bonus);
            scored
        })
        .collect();

    ranked.sort_by(|left, right| {
        right
            .compatibility_score
            .cmp(&left.compatibility_score)
            .then_with(|| left.name.cmp(&right.name))
    });
    ranked.truncate(criteria.max_results.max(1));

    let countries_covered = ranked
        .iter()
        .map(|partner| partner.country.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    PartnerMatches {
        search_metadata: SearchMetadata {
            total_found: ranked.len(),
            countries_covered,
            search_focus: criteria.project_focus.clone(),
        },
        potential_partners: ranked,
    }
}

#[cfg(test)]
mod tests {
    use super::{rank_partners, PartnerCriteria, DEFAULT_MAX_RESULTS};
    use crate::domain::partner::{ContactInfo, OrganizationType, Partner, PartnerId};

    fn partner(name: &str, country: &str, expertise: &[&str], score: u8) -> Partner {
        Partner {
            id: PartnerId(format!("p-{name}")),
            name: name.to_string(),
            country: country.to_string(),
            organization_type: OrganizationType::Ngo,
            expertise_areas: expertise.iter().map(ToString::to_string).collect(),
            contact_info: ContactInfo::default(),
            erasmus_code: format!("EC-{name}"),
            compatibility_score: score,
            partnership_rationale: None,
        }
    }

    fn catalog() -> Vec<Partner> {
        vec![
            partner("Digital Youth Foundation", "Germany", &["Digital Skills", "Youth Work"], 9),
            partner("Green Action Network", "Netherlands", &["Sustainability"], 8),
            partner("Inclusion Works", "Spain", &["Social Inclusion", "Youth Work"], 7),
            partner("Max Score", "Spain", &["Youth Work"], 10),
        ]
    }

    fn criteria(focus: &str, countries: &[&str], expertise: &[&str]) -> PartnerCriteria {
        PartnerCriteria {
            project_focus: focus.to_string(),
            required_countries: countries.iter().map(ToString::to_string).collect(),
            expertise_areas: expertise.iter().map(ToString::to_string).collect(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    #[test]
    fn country_allow_list_is_respected() {
        let matches =
            rank_partners(&catalog(), &criteria("Inclusion", &["Germany", "Spain"], &["youth work"]));
        assert_eq!(matches.potential_partners.len(), 3);
        assert!(matches
            .potential_partners
            .iter()
            .all(|partner| partner.country == "Germany" || partner.country == "Spain"));
        assert_eq!(matches.search_metadata.countries_covered, vec!["Germany", "Spain"]);
    }

    #[test]
    fn focus_bonus_is_capped_at_ten() {
        let matches = rank_partners(&catalog(), &criteria("Youth Work", &[], &[]));
        let max = matches
            .potential_partners
            .iter()
            .find(|partner| partner.name == "Max Score")
            .expect("max score partner present");
        assert_eq!(max.compatibility_score, 10);
        assert!(matches
            .potential_partners
            .iter()
            .all(|partner| (1..=10).contains(&partner.compatibility_score)));
    }

    #[test]
    fn ranking_is_descending_with_name_tiebreak() {
        let matches = rank_partners(&catalog(), &criteria("Youth Work", &[], &[]));
        let names: Vec<&str> =
            matches.potential_partners.iter().map(|partner| partner.name.as_str()).collect();
        // Digital Youth Foundation 9+1 ties with Max Score 10.
        assert_eq!(
            names,
            vec!["Digital Youth Foundation", "Max Score", "Green Action Network", "Inclusion Works"]
        );
    }

    #[test]
    fn short_focus_does_not_match_inside_longer_words() {
        let catalog = vec![
            partner("Arts Hub", "France", &["Participation"], 5),
            partner("Tech Lab", "France", &["IT"], 5),
        ];

        let art = rank_partners(&catalog, &criteria("Art", &[], &[]));
        assert!(art.potential_partners.iter().all(|partner| partner.compatibility_score == 5));

        let digital = rank_partners(&catalog, &criteria("Digital Community", &[], &[]));
        assert!(digital.potential_partners.iter().all(|partner| partner.compatibility_score == 5));
    }

    #[test]
    fn ranking_is_idempotent() {
        let input = criteria("Digital Skills", &[], &["Youth Work", "Sustainability"]);
        assert_eq!(rank_partners(&catalog(), &input), rank_partners(&catalog(), &input));
    }

    #[test]
    fn max_results_truncates_after_sorting() {
        let mut input = criteria("", &[], &[]);
        input.max_results = 2;
        let matches = rank_partners(&catalog(), &input);
        assert_eq!(matches.search_metadata.total_found, 2);
        assert_eq!(matches.potential_partners[0].name, "Max Score");
    }
}
