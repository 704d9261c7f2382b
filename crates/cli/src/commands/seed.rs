use horizon_db::{Repositories, SeedDataset, SeedResult, VerificationResult};

use crate::commands::{block_on, finish, load_config, open_database, CommandResult, StepFailure};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let result = block_on("seed", async {
        let pool = open_database(&config).await?;
        let repositories = Repositories::sql(pool.clone());

        let outcome = async {
            let seeded = SeedDataset::load(&repositories)
                .await
                .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
            let verification = SeedDataset::verify(&repositories)
                .await
                .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;
            if verification.all_present {
                Ok::<SeedResult, StepFailure>(seeded)
            } else {
                Err(("seed_verification", verification_failure_message(&verification), 6u8))
            }
        }
        .await;

        pool.close().await;
        outcome
    });

    finish("seed", result, |seeded: SeedResult| {
        format!(
            "seed dataset loaded: {} partner organizations, {} knowledge entries",
            seeded.partners_seeded, seeded.knowledge_seeded
        )
    })
}

fn verification_failure_message(verification: &VerificationResult) -> String {
    let failed_checks = verification
        .checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(check.as_str()))
        .collect::<Vec<_>>();
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use horizon_db::VerificationResult;

    use super::verification_failure_message;

    #[test]
    fn verification_message_names_failed_checks() {
        let verification = VerificationResult {
            all_present: false,
            checks: vec![
                ("partner:E10000001".to_string(), true),
                ("partner:E10000002".to_string(), false),
                ("knowledge:kb-guide".to_string(), false),
            ],
        };

        assert_eq!(
            verification_failure_message(&verification),
            "Seed verification failed for checks: partner:E10000002, knowledge:kb-guide"
        );
    }

    #[test]
    fn verification_message_falls_back_to_generic_text() {
        let verification = VerificationResult {
            all_present: false,
            checks: vec![("partner:E10000001".to_string(), true)],
        };

        assert_eq!(verification_failure_message(&verification), "Some seed data failed to load");
    }
}
