//! Interactive numbered menu. Every option calls the same runtime the HTTP
//! server uses, in-process.

use std::io::{self, BufRead, Write};

use horizon_agent::tools::{ApplicationContentResult, BrainstormResult};
use horizon_agent::{AgentRuntime, AgentType, ChatReply, ToolContext};
use horizon_core::domain::project::FocusArea;
use horizon_core::matching::{PartnerMatches, DEFAULT_MAX_RESULTS};
use horizon_core::outcome::ToolOutcome;
use horizon_core::requests::{
    ApplicationContentRequest, BrainstormRequest, ChatRequest, PartnerSearchRequest, PromptMode,
};
use horizon_db::Repositories;
use serde_json::{Map, Value};

use crate::commands::{block_on, finish, load_config, open_database, CommandResult};

const BANNER: &str = "Open Horizon\nErasmus+ project assistant: ideas, partners and application text.";

const MENU: &str = "\
Main menu
  1. Brainstorm project ideas
  2. Discover project partners
  3. Generate application content
  4. Chat with an assistant
  5. Help
  6. Exit";

const HELP: &str = "\
Open Horizon helps an NGO prepare Erasmus+ applications.

  Brainstorm   turn a rough idea into scored project concepts
  Partners     rank partner organizations by focus, country and expertise
  Application  draft a section and check it against evaluator criteria
  Chat         ask the brainstorming, planning or application assistant

Focus areas: Digital Transformation, Green Transition, Inclusion and Diversity,
Participation, European Values, Innovation.

Start with brainstorming, then find partners, then write section by section.";

pub const SECTIONS: [&str; 6] = [
    "Project Description",
    "Methodology",
    "Impact",
    "Project Management",
    "Dissemination",
    "Budget Justification",
];

const CHAT_EXIT_WORDS: [&str; 3] = ["quit", "exit", "q"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuChoice {
    Brainstorm,
    Partners,
    Application,
    Chat,
    Help,
    Exit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "1" | "brainstorm" => Some(Self::Brainstorm),
            "2" | "partners" => Some(Self::Partners),
            "3" | "application" => Some(Self::Application),
            "4" | "chat" => Some(Self::Chat),
            "5" | "help" => Some(Self::Help),
            "6" | "exit" | "quit" | "q" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// Opens the database and the LLM client from config, then runs the menu on
/// stdin/stdout until the user exits or input ends.
pub fn run(user_id: &str) -> CommandResult {
    let config = match load_config("menu") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let result = block_on("menu", async {
        let pool = open_database(&config).await?;
        let outcome = async {
            let runtime = AgentRuntime::from_config(&config.llm, Repositories::sql(pool.clone()))
                .map_err(|error| ("runtime_init", error.to_string(), 3u8))?;
            let stdin = io::stdin();
            let mut session = MenuSession::new(&runtime, user_id, stdin.lock(), io::stdout());
            let finished = session.run().await;
            finished.map_err(|error| ("terminal_io", error.to_string(), 7u8))
        }
        .await;
        pool.close().await;
        outcome
    });

    finish("menu", result, |()| "menu session ended".to_string())
}

pub struct MenuSession<'a, R, W> {
    runtime: &'a AgentRuntime,
    context: ToolContext,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> MenuSession<'a, R, W> {
    pub fn new(runtime: &'a AgentRuntime, user_id: &str, input: R, output: W) -> Self {
        Self { runtime, context: ToolContext::for_user(user_id), input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub async fn run(&mut self) -> io::Result<()> {
        writeln!(self.output, "{BANNER}")?;
        loop {
            writeln!(self.output, "\n{MENU}")?;
            let Some(line) = self.ask("Choose an option (1-6)")? else {
                break;
            };
            match MenuChoice::parse(&line) {
                Some(MenuChoice::Brainstorm) => self.brainstorm().await?,
                Some(MenuChoice::Partners) => self.partners().await?,
                Some(MenuChoice::Application) => self.application().await?,
                Some(MenuChoice::Chat) => self.chat().await?,
                Some(MenuChoice::Help) => writeln!(self.output, "\n{HELP}")?,
                Some(MenuChoice::Exit) => {
                    writeln!(self.output, "Goodbye.")?;
                    break;
                }
                None => writeln!(self.output, "Unknown option `{line}`. Pick a number from 1 to 6.")?,
            }
        }
        self.output.flush()
    }

    /// `None` once input is exhausted.
    fn ask(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.output, "{label}: ")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn ask_or_empty(&mut self, label: &str) -> io::Result<String> {
        Ok(self.ask(label)?.unwrap_or_default())
    }

    /// Picks from a 1-based list; blank or out-of-range input picks nothing.
    fn choose<'o>(&mut self, label: &str, options: &[&'o str]) -> io::Result<Option<&'o str>> {
        for (index, option) in options.iter().enumerate() {
            writeln!(self.output, "  {}. {option}", index + 1)?;
        }
        let answer = self.ask_or_empty(label)?;
        Ok(answer
            .parse::<usize>()
            .ok()
            .and_then(|choice| choice.checked_sub(1))
            .and_then(|index| options.get(index).copied()))
    }

    async fn brainstorm(&mut self) -> io::Result<()> {
        writeln!(self.output, "\nProject brainstorming")?;
        let concept = self.ask_or_empty("What is your initial project idea")?;
        if concept.is_empty() {
            writeln!(self.output, "Please provide an initial concept to get started.")?;
            return Ok(());
        }

        let labels: Vec<&str> = FocusArea::ALL.iter().map(FocusArea::label).collect();
        let focus = self.choose("Focus area (1-6, Enter to skip)", &labels)?;

        let mut request = BrainstormRequest::new(concept);
        request.focus_preference = focus.and_then(FocusArea::from_label);

        writeln!(self.output, "Generating project concepts...")?;
        let outcome = self.runtime.brainstorm(&self.context, request).await;
        writeln!(self.output, "{}", render_brainstorm(&outcome))
    }

    async fn partners(&mut self) -> io::Result<()> {
        writeln!(self.output, "\nPartner discovery")?;
        let focus = self.ask_or_empty("Main focus of your project")?;
        if focus.is_empty() {
            writeln!(self.output, "Please provide a project focus.")?;
            return Ok(());
        }
        let countries = split_list(&self.ask_or_empty("Required countries (comma-separated, Enter to skip)")?);
        let expertise = split_list(&self.ask_or_empty("Required expertise (comma-separated, Enter to skip)")?);

        let request = PartnerSearchRequest {
            project_focus: focus,
            required_countries: (!countries.is_empty()).then_some(countries),
            expertise_areas: expertise,
            max_results: DEFAULT_MAX_RESULTS,
            project_id: None,
        };

        writeln!(self.output, "Searching the partner catalog...")?;
        let outcome = self.runtime.discover_partners(&self.context, request).await;
        writeln!(self.output, "{}", render_partners(&outcome))
    }

    async fn application(&mut self) -> io::Result<()> {
        writeln!(self.output, "\nApplication content")?;
        let Some(section) = self.choose("Section to generate (1-6)", &SECTIONS)? else {
            writeln!(self.output, "No section selected.")?;
            return Ok(());
        };

        let mut context = Map::new();
        for (key, label, default) in [
            ("title", "Project title", ""),
            ("focus_area", "Focus area", "Digital Transformation"),
            ("target_audience", "Target audience", "Young people 18-30"),
        ] {
            let answer = self.ask_or_empty(&format!("{label} [{default}]"))?;
            let value = if answer.is_empty() { default.to_string() } else { answer };
            if !value.is_empty() {
                context.insert(key.to_string(), Value::String(value));
            }
        }
        let word_limit = self.ask_or_empty("Word limit (Enter for none)")?.parse::<usize>().ok();

        let request = ApplicationContentRequest {
            section_type: section.to_string(),
            project_context: context,
            word_limit,
            project_id: None,
        };

        writeln!(self.output, "Drafting {section}...")?;
        let outcome = self.runtime.generate_application_content(&self.context, request).await;
        writeln!(self.output, "{}", render_application(&outcome))
    }

    async fn chat(&mut self) -> io::Result<()> {
        writeln!(self.output, "\nChoose an assistant")?;
        let names: Vec<&str> = AgentType::ALL.iter().map(AgentType::as_str).collect();
        let agent = self.choose("Assistant (1-3, Enter for brainstorming)", &names)?.unwrap_or("brainstorming");
        writeln!(self.output, "Connected to the {agent} assistant. Type `quit` to return to the menu.")?;

        let mut session_id = None;
        loop {
            let Some(message) = self.ask("You")? else {
                break;
            };
            if CHAT_EXIT_WORDS.contains(&message.to_ascii_lowercase().as_str()) {
                break;
            }
            if message.is_empty() {
                continue;
            }

            let request = ChatRequest {
                message,
                agent_type: agent.to_string(),
                mode: PromptMode::Standard,
                project_id: None,
                session_id: session_id.clone(),
            };
            let outcome = self.runtime.chat(&self.context, request).await;
            if let Some(reply) = &outcome.data {
                session_id = Some(reply.session_id.clone());
            }
            writeln!(self.output, "{}", render_chat(&outcome))?;
        }
        Ok(())
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|item| !item.is_empty()).map(String::from).collect()
}

fn failure_line<T>(what: &str, outcome: &ToolOutcome<T>) -> String {
    let code = outcome.error_code.map(|code| code.as_str()).unwrap_or("API_FAILURE");
    let message = outcome.error.as_deref().unwrap_or("no details");
    format!("{what} failed [{code}]: {message}")
}

pub fn render_brainstorm(outcome: &ToolOutcome<BrainstormResult>) -> String {
    let Some(result) = outcome.data.as_ref().filter(|_| outcome.success) else {
        return failure_line("Brainstorming", outcome);
    };

    let mut lines = vec![format!("Generated {} project concepts:", result.project_concepts.len())];
    for (index, concept) in result.project_concepts.iter().enumerate() {
        lines.push(format!("\nConcept {}: {}", index + 1, concept.title));
        lines.push(format!("  Focus area:       {}", concept.focus_area.label()));
        lines.push(format!("  Target audience:  {}", concept.target_audience));
        lines.push(format!("  Innovation angle: {}", concept.innovation_angle));
        lines.push(format!("  Feasibility:      {}/10", concept.feasibility_score));
        lines.push(format!("  Rationale:        {}", concept.rationale));
    }
    if !result.next_steps.is_empty() {
        lines.push("\nRecommended next steps:".to_string());
        lines.extend(result.next_steps.iter().map(|step| format!("  - {step}")));
    }
    lines.join("\n")
}

pub fn render_partners(outcome: &ToolOutcome<PartnerMatches>) -> String {
    let Some(matches) = outcome.data.as_ref().filter(|_| outcome.success) else {
        return failure_line("Partner search", outcome);
    };

    let mut lines = vec![format!("Found {} potential partners:", matches.potential_partners.len())];
    for partner in &matches.potential_partners {
        lines.push(format!("\n{} ({}, {})", partner.name, partner.country, partner.organization_type));
        lines.push(format!("  Expertise:     {}", partner.expertise_areas.join(", ")));
        lines.push(format!("  Compatibility: {}/10", partner.compatibility_score));
        if let Some(rationale) = &partner.partnership_rationale {
            lines.push(format!("  Why:           {rationale}"));
        }
        lines.push(format!(
            "  Contact:       {}",
            partner.contact_info.email.as_deref().unwrap_or("N/A")
        ));
    }
    lines.push(format!(
        "\nSearch covered {} countries",
        matches.search_metadata.countries_covered.len()
    ));
    lines.join("\n")
}

pub fn render_application(outcome: &ToolOutcome<ApplicationContentResult>) -> String {
    let Some(result) = outcome.data.as_ref().filter(|_| outcome.success) else {
        return failure_line("Content generation", outcome);
    };
    let content = &result.generated_content;
    let details = &content.compliance_details;

    let mut lines = vec![
        format!("{}:", content.section_name),
        String::new(),
        content.content.clone(),
        String::new(),
        format!("Word count: {}", content.word_count),
        format!(
            "Compliance: {}",
            if content.compliance_status { "compliant" } else { "needs improvement" }
        ),
    ];
    for (heading, items) in [
        ("Strengths", &details.strength_areas),
        ("Missing elements", &details.missing_elements),
        ("Suggestions", &details.improvement_suggestions),
    ] {
        if !items.is_empty() {
            lines.push(format!("{heading}:"));
            lines.extend(items.iter().map(|item| format!("  - {item}")));
        }
    }
    if !result.alternative_versions.is_empty() {
        lines.push(format!("{} alternative versions available:", result.alternative_versions.len()));
        lines.extend(result.alternative_versions.iter().map(|alternative| {
            format!("  - {} ({} words)", alternative.focus, alternative.word_count)
        }));
    }
    lines.join("\n")
}

pub fn render_chat(outcome: &ToolOutcome<ChatReply>) -> String {
    match outcome.data.as_ref().filter(|_| outcome.success) {
        Some(reply) if reply.tools_used.is_empty() => format!("Assistant: {}", reply.response),
        Some(reply) => {
            format!("Assistant: {}\n  (tools used: {})", reply.response, reply.tools_used.join(", "))
        }
        None => failure_line("Chat", outcome),
    }
}

#[cfg(test)]
mod tests {
    use horizon_core::errors::ErrorCode;
    use horizon_core::outcome::ToolOutcome;

    use horizon_agent::{AgentType, ChatReply};

    use super::{render_chat, split_list, MenuChoice};

    #[test]
    fn menu_accepts_numbers_and_names() {
        assert_eq!(MenuChoice::parse(" 1 "), Some(MenuChoice::Brainstorm));
        assert_eq!(MenuChoice::parse("Chat"), Some(MenuChoice::Chat));
        assert_eq!(MenuChoice::parse("6"), Some(MenuChoice::Exit));
        assert_eq!(MenuChoice::parse("7"), None);
        assert_eq!(MenuChoice::parse(""), None);
    }

    #[test]
    fn chat_lists_the_tools_the_assistant_used() {
        let outcome = ToolOutcome::ok(ChatReply {
            agent_type: AgentType::Planning,
            response: "Two partners fit.".to_string(),
            session_id: "s-1".to_string(),
            tools_used: vec!["discover_erasmus_partners".to_string()],
        });
        assert_eq!(
            render_chat(&outcome),
            "Assistant: Two partners fit.\n  (tools used: discover_erasmus_partners)"
        );
    }

    #[test]
    fn comma_lists_drop_blanks() {
        assert_eq!(split_list("Germany, ,Spain,"), vec!["Germany", "Spain"]);
        assert!(split_list("   ").is_empty());
    }

    #[test]
    fn failures_show_the_error_code() {
        let outcome = ToolOutcome::<horizon_agent::ChatReply>::failure(
            ErrorCode::NetworkError,
            "llm request timed out after 30s",
        );
        assert_eq!(
            render_chat(&outcome),
            "Chat failed [NETWORK_ERROR]: llm request timed out after 30s"
        );
    }
}
