//! Chat turn dispatch.
//!
//! A turn is answered by the configured language model when there is one,
//! otherwise by keyword routing over the user's text. A failed model call
//! never reaches the caller; it becomes [`CONNECTION_FALLBACK`].

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::ai_provider::{AIConfig, AIProviderClient, CompletionRequest, LanguageModel, ProviderError};
use crate::core::chat::random_greeting;
use crate::core::tips::category_overview;
use crate::core::{
    compare, format_amount, highest_category, tips_for, top_tips, Category, ChatMessage,
    ConversationState, FactorTable,
};

pub const SYSTEM_INSTRUCTION: &str = "You are a knowledgeable assistant specializing in carbon footprints and sustainability. \
Keep answers concise, helpful, and focused on helping the user understand and reduce their carbon footprint.";

pub const CONNECTION_FALLBACK: &str = "I'm having trouble connecting to my knowledge base right now. \
Let me share some general tips about carbon footprints instead. \
To reduce your carbon footprint, consider using public transportation, reducing meat consumption, \
and minimizing energy usage at home.";

pub const CALCULATE_FIRST: &str =
    "To see your total carbon footprint, please calculate it first by entering your information.";

pub const THANKS_REPLY: &str =
    "You're welcome! I'm happy to help you understand and reduce your carbon footprint.";

pub const GENERIC_HELP: &str = "I'm here to help you understand your carbon footprint and provide tips to reduce it. \
You can ask me about specific categories like transportation, electricity, diet, or waste, \
or ask for general reduction tips.";

/// Transcript messages sent to the model ahead of the new user message.
pub const HISTORY_WINDOW: usize = 10;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Keyword-routing outcome for a fallback reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Category(Category),
    Total,
    Tips,
    Greeting,
    Thanks,
    Help,
}

/// Evaluated top to bottom; the first rule with a matching keyword wins.
const ROUTES: &[(&[&str], Route)] = &[
    (&["transportation", "commute", "car"], Route::Category(Category::Transportation)),
    (&["electricity", "energy", "power"], Route::Category(Category::Electricity)),
    (&["diet", "food", "eat"], Route::Category(Category::Diet)),
    (&["waste", "trash", "garbage"], Route::Category(Category::Waste)),
    (&["total", "overall", "footprint"], Route::Total),
    (&["tip", "help", "reduce"], Route::Tips),
    (&["hi", "hello", "hey"], Route::Greeting),
    (&["thank"], Route::Thanks),
];

/// Substring match over the lowercased text, so "hi" also fires inside "this".
pub fn route(text: &str) -> Route {
    let lowered = text.to_lowercase();
    ROUTES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map_or(Route::Help, |(_, route)| *route)
}

pub struct Assistant {
    table: FactorTable,
    model: Option<Box<dyn LanguageModel>>,
    timeout: Duration,
}

impl Assistant {
    /// Keyword routing only.
    pub fn offline(table: FactorTable) -> Self {
        Assistant {
            table,
            model: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn delegated(table: FactorTable, model: Box<dyn LanguageModel>, timeout: Duration) -> Self {
        Assistant {
            table,
            model: Some(model),
            timeout,
        }
    }

    /// Delegated mode when `ai_config` yields a usable client, fallback mode
    /// for the whole session otherwise.
    pub fn connect(table: FactorTable, ai_config: Result<AIConfig, ProviderError>) -> Self {
        let client = ai_config.and_then(|config| {
            let timeout = config.timeout();
            AIProviderClient::new(config).map(|client| (client, timeout))
        });

        match client {
            Ok((client, timeout)) => {
                info!(model = %client.name(), "assistant using language model");
                Self::delegated(table, Box::new(client), timeout)
            }
            Err(e) => {
                info!("assistant using keyword replies: {}", e);
                Self::offline(table)
            }
        }
    }

    pub fn is_delegated(&self) -> bool {
        self.model.is_some()
    }

    pub fn table(&self) -> &FactorTable {
        &self.table
    }

    /// Answer `user_text`, recording both the question and the reply in `state`.
    pub async fn reply(&self, user_text: &str, state: &mut ConversationState) -> ChatMessage {
        state.push(ChatMessage::user(user_text));

        let content = match &self.model {
            Some(model) => {
                let request = self.build_request(state);
                compose(self.delegate(&**model, &request).await)
            }
            None => self.fallback_reply(user_text, state),
        };

        let reply = ChatMessage::assistant(content);
        state.push(reply.clone());
        reply
    }

    /// Summarise a fresh calculation into the transcript. Only the model-backed
    /// assistant announces results; returns the appended message if any.
    pub fn announce_result(&self, state: &mut ConversationState) -> Option<ChatMessage> {
        if !self.is_delegated() {
            return None;
        }
        let footprint = *state.footprint()?;
        let verdict = match compare(&self.table, footprint.total, state.region()) {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(error = %e, "skipping result announcement");
                return None;
            }
        };

        let mut text = format!(
            "I've analyzed your carbon footprint data. Your total emissions are {} tonnes CO2/year, ",
            format_amount(footprint.total)
        );
        if verdict.above {
            text.push_str(&format!(
                "which is above the {} average of {} tonnes CO2/year. Your highest emission category is {}. \
                 Would you like specific tips to reduce your impact in this area?",
                verdict.region,
                format_amount(verdict.average),
                highest_category(&footprint)
            ));
        } else {
            text.push_str(&format!(
                "which is below the {} average of {} tonnes CO2/year. \
                 Great job! Would you like to know how you can reduce your footprint even further?",
                verdict.region,
                format_amount(verdict.average)
            ));
        }

        let message = ChatMessage::assistant(text);
        state.push(message.clone());
        Some(message)
    }

    /// The request for the turn whose user message is last in `state`.
    pub fn build_request(&self, state: &ConversationState) -> CompletionRequest {
        let (history, new_message) = match state.messages().split_last() {
            Some((last, rest)) => (rest, Some(last)),
            None => (state.messages(), None),
        };
        let start = history.len().saturating_sub(HISTORY_WINDOW);

        let mut messages = history[start..].to_vec();
        messages.extend(new_message.cloned());

        CompletionRequest {
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            context: self.context_block(state),
            messages,
        }
    }

    fn context_block(&self, state: &ConversationState) -> Option<String> {
        let footprint = state.footprint()?;
        let region = state.region();

        let mut lines = vec![
            "User's carbon footprint data:".to_string(),
            format!("- Total emissions: {} tonnes CO2/year", format_amount(footprint.total)),
        ];
        for (category, value) in footprint.by_category() {
            lines.push(format!("- {}: {} tonnes CO2/year", category, format_amount(value)));
        }
        lines.push(format!("- Country: {}", region));
        if let Ok(average) = self.table.average(region) {
            lines.push(format!("- Country average: {} tonnes CO2/year", format_amount(average)));
        }
        lines.push(format!("- Highest emission category: {}", highest_category(footprint)));

        Some(lines.join("\n"))
    }

    async fn delegate(
        &self,
        model: &dyn LanguageModel,
        request: &CompletionRequest,
    ) -> Result<String, ProviderError> {
        debug!(
            model = %model.name(),
            messages = request.messages.len(),
            with_context = request.context.is_some(),
            "delegating chat turn"
        );
        match tokio::time::timeout(self.timeout, model.complete(request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProviderError::Timeout(self.timeout)),
        }
    }

    /// Deterministic reply used when no model is configured.
    pub fn fallback_reply(&self, user_text: &str, state: &ConversationState) -> String {
        let route = route(user_text);
        debug!(?route, "keyword route selected");

        match route {
            Route::Category(category) => category_reply(category, state),
            Route::Total => self.total_reply(state),
            Route::Tips => general_tips(),
            Route::Greeting => random_greeting().to_string(),
            Route::Thanks => THANKS_REPLY.to_string(),
            Route::Help => GENERIC_HELP.to_string(),
        }
    }

    fn total_reply(&self, state: &ConversationState) -> String {
        let Some(footprint) = state.footprint() else {
            return CALCULATE_FIRST.to_string();
        };

        match compare(&self.table, footprint.total, state.region()) {
            Ok(verdict) => format!(
                "Your total carbon footprint is {} tonnes CO2/year, which is {}.",
                format_amount(footprint.total),
                verdict.describe()
            ),
            Err(e) => {
                warn!(error = %e, "comparison unavailable");
                format!(
                    "Your total carbon footprint is {} tonnes CO2/year.",
                    format_amount(footprint.total)
                )
            }
        }
    }
}

/// The single place a model outcome becomes reply text.
fn compose(outcome: Result<String, ProviderError>) -> String {
    match outcome {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            warn!("language model returned an empty reply, using fallback text");
            CONNECTION_FALLBACK.to_string()
        }
        Err(e) => {
            warn!(error = %e, "language model call failed, using fallback text");
            CONNECTION_FALLBACK.to_string()
        }
    }
}

fn category_reply(category: Category, state: &ConversationState) -> String {
    let Some(footprint) = state.footprint() else {
        return category_overview(category).to_string();
    };

    let label = match category {
        Category::Transportation => "transportation",
        Category::Electricity => "electricity",
        Category::Diet => "diet-related",
        Category::Waste => "waste-related",
    };
    let bullets = top_tips(category, 3)
        .iter()
        .map(|tip| format!("• {}", tip))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Your {} emissions are {} tonnes CO2/year. Here are some tips to reduce them:\n{}",
        label,
        format_amount(footprint.emissions(category)),
        bullets
    )
}

fn general_tips() -> String {
    let mut text = String::from("Here are some general tips to reduce your carbon footprint:\n");
    for category in Category::ALL {
        let tips = tips_for(category);
        text.push_str(&format!("\n{}:\n• {}\n• {}", category, tips[0], tips[1]));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chat::GREETINGS;
    use crate::core::{compute, FootprintResult, LifestyleInput, Region, Role};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct RecordingModel {
        answer: String,
        seen: Arc<Mutex<Vec<CompletionRequest>>>,
    }

    #[async_trait]
    impl LanguageModel for RecordingModel {
        fn name(&self) -> String {
            "recording".to_string()
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(self.answer.clone())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl LanguageModel for FailingModel {
        fn name(&self) -> String {
            "failing".to_string()
        }

        async fn complete(&self, _request: &CompletionRequest) -> Result<String, ProviderError> {
            Err(ProviderError::Api {
                provider: crate::ai_provider::AIProvider::OpenAI,
                status: 401,
                body: "invalid api key".to_string(),
            })
        }
    }

    struct HangingModel;

    #[async_trait]
    impl LanguageModel for HangingModel {
        fn name(&self) -> String {
            "hanging".to_string()
        }

        async fn complete(&self, _request: &CompletionRequest) -> Result<String, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".to_string())
        }
    }

    fn recording(answer: &str) -> (Assistant, Arc<Mutex<Vec<CompletionRequest>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let model = RecordingModel {
            answer: answer.to_string(),
            seen: Arc::clone(&seen),
        };
        let assistant = Assistant::delegated(FactorTable::builtin(), Box::new(model), DEFAULT_TIMEOUT);
        (assistant, seen)
    }

    fn calculated_state() -> ConversationState {
        let input = LifestyleInput::default();
        let result = compute(&FactorTable::builtin(), &input).unwrap();
        let mut state = ConversationState::new(input.region);
        state.record_footprint(input.region, result);
        state
    }

    #[test]
    fn test_route_precedence() {
        assert_eq!(
            route("I eat food while driving my car"),
            Route::Category(Category::Transportation)
        );
        assert_eq!(
            route("How much POWER does my diet use?"),
            Route::Category(Category::Electricity)
        );
        assert_eq!(route("what about my food waste"), Route::Category(Category::Diet));
        assert_eq!(route("garbage"), Route::Category(Category::Waste));
        assert_eq!(route("show my overall footprint"), Route::Total);
        assert_eq!(route("any tips?"), Route::Tips);
        assert_eq!(route("Hello there"), Route::Greeting);
        assert_eq!(route("Thanks a lot"), Route::Thanks);
        assert_eq!(route("what is the time"), Route::Help);
    }

    #[test]
    fn test_route_matches_substrings() {
        // "hi" inside "this"
        assert_eq!(route("is this ok"), Route::Greeting);
        // "car" inside "scary"
        assert_eq!(route("scary numbers"), Route::Category(Category::Transportation));
    }

    #[test]
    fn test_category_reply_before_calculation_is_generic() {
        let assistant = Assistant::offline(FactorTable::builtin());
        let state = ConversationState::new(Region::India);

        let reply = assistant.fallback_reply("tell me about electricity", &state);
        assert_eq!(reply, category_overview(Category::Electricity));
        assert!(!reply.chars().any(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_category_reply_after_calculation_reports_emissions() {
        let assistant = Assistant::offline(FactorTable::builtin());
        let state = calculated_state();

        let reply = assistant.fallback_reply("How bad is my commute?", &state);
        assert!(reply.starts_with("Your transportation emissions are 0.51 tonnes CO2/year."));
        for tip in top_tips(Category::Transportation, 3) {
            assert!(reply.contains(tip));
        }
        assert!(!reply.contains(tips_for(Category::Transportation)[3]));

        let reply = assistant.fallback_reply("garbage", &state);
        assert!(reply.starts_with("Your waste-related emissions are 0.01 tonnes CO2/year."));
    }

    #[test]
    fn test_total_reply() {
        let assistant = Assistant::offline(FactorTable::builtin());

        let empty = ConversationState::new(Region::India);
        assert_eq!(assistant.fallback_reply("what's my total?", &empty), CALCULATE_FIRST);

        let reply = assistant.fallback_reply("what's my total?", &calculated_state());
        assert_eq!(
            reply,
            "Your total carbon footprint is 1.95 tonnes CO2/year, which is 2.6% higher than the India average of 1.9 tonnes CO2/year."
        );
    }

    #[test]
    fn test_whole_numbers_keep_a_decimal() {
        let assistant = Assistant::offline(FactorTable::builtin());
        let mut state = ConversationState::new(Region::EuropeanUnion);
        state.record_footprint(
            Region::EuropeanUnion,
            FootprintResult {
                transportation: 1.0,
                electricity: 0.8,
                diet: 1.0,
                waste: 0.4,
                total: 3.2,
            },
        );

        let reply = assistant.fallback_reply("overall", &state);
        assert_eq!(
            reply,
            "Your total carbon footprint is 3.2 tonnes CO2/year, which is 50.0% lower than the European Union average of 6.4 tonnes CO2/year."
        );

        let reply = assistant.fallback_reply("my car", &state);
        assert!(reply.starts_with("Your transportation emissions are 1.0 tonnes CO2/year."));
    }

    #[test]
    fn test_tips_reply_lists_two_per_category() {
        let assistant = Assistant::offline(FactorTable::builtin());
        let reply = assistant.fallback_reply("please reduce", &ConversationState::default());

        for category in Category::ALL {
            let tips = tips_for(category);
            assert!(reply.contains(&format!("{}:\n• {}\n• {}", category, tips[0], tips[1])));
            assert!(!reply.contains(tips[2]));
        }
    }

    #[test]
    fn test_greeting_thanks_and_help() {
        let assistant = Assistant::offline(FactorTable::builtin());
        let state = ConversationState::default();

        let greeting = assistant.fallback_reply("hey", &state);
        assert!(GREETINGS.contains(&greeting.as_str()));
        assert_eq!(assistant.fallback_reply("thank you", &state), THANKS_REPLY);
        assert_eq!(assistant.fallback_reply("what?", &state), GENERIC_HELP);
    }

    #[tokio::test]
    async fn test_offline_reply_appends_user_and_assistant_messages() {
        let assistant = Assistant::offline(FactorTable::builtin());
        let mut state = ConversationState::with_greeting(Region::India);

        let reply = assistant.reply("thanks", &mut state).await;

        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, THANKS_REPLY);
        let messages = state.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "thanks");
        assert_eq!(messages[2], reply);
    }

    #[tokio::test]
    async fn test_delegated_request_without_calculation_has_no_context() {
        let (assistant, seen) = recording("Try cycling.");
        let mut state = ConversationState::with_greeting(Region::India);

        let reply = assistant.reply("How can I cut emissions?", &mut state).await;
        assert_eq!(reply.content, "Try cycling.");

        let requests = seen.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system_instruction, SYSTEM_INSTRUCTION);
        assert!(requests[0].context.is_none());
        assert_eq!(requests[0].messages.len(), 2);
        assert_eq!(requests[0].messages[1].content, "How can I cut emissions?");
    }

    #[tokio::test]
    async fn test_delegated_request_carries_context_and_recent_window() {
        let (assistant, seen) = recording("ok");
        let mut state = calculated_state();
        for i in 0..15 {
            state.push(ChatMessage::user(format!("q{i}")));
            state.push(ChatMessage::assistant(format!("a{i}")));
        }

        assistant.reply("latest question", &mut state).await;

        let requests = seen.lock().unwrap();
        let request = &requests[0];
        assert_eq!(request.messages.len(), HISTORY_WINDOW + 1);
        assert_eq!(request.messages[0].content, "q10");
        assert_eq!(request.messages[HISTORY_WINDOW - 1].content, "a14");
        assert_eq!(request.messages[HISTORY_WINDOW].content, "latest question");

        let context = request.context.as_deref().unwrap();
        assert!(context.contains("- Total emissions: 1.95 tonnes CO2/year"));
        assert!(context.contains("- Diet: 0.77 tonnes CO2/year"));
        assert!(context.contains("- Country: India"));
        assert!(context.contains("- Country average: 1.9 tonnes CO2/year"));
        assert!(context.contains("- Highest emission category: Diet"));
    }

    #[tokio::test]
    async fn test_failed_call_yields_fixed_fallback() {
        let assistant =
            Assistant::delegated(FactorTable::builtin(), Box::new(FailingModel), DEFAULT_TIMEOUT);
        let mut state = ConversationState::new(Region::India);

        let reply = assistant.reply("tell me about electricity", &mut state).await;

        assert_eq!(reply.content, CONNECTION_FALLBACK);
        let assistant_messages: Vec<_> = state
            .messages()
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .collect();
        assert_eq!(assistant_messages.len(), 1);
        assert_eq!(assistant_messages[0].content, CONNECTION_FALLBACK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_call_times_out_to_fallback() {
        let assistant = Assistant::delegated(
            FactorTable::builtin(),
            Box::new(HangingModel),
            Duration::from_secs(15),
        );
        let mut state = ConversationState::new(Region::India);

        let reply = assistant.reply("hello?", &mut state).await;
        assert_eq!(reply.content, CONNECTION_FALLBACK);
    }

    #[tokio::test]
    async fn test_blank_model_reply_yields_fallback() {
        let (assistant, _) = recording("   ");
        let mut state = ConversationState::new(Region::India);
        let reply = assistant.reply("hi", &mut state).await;
        assert_eq!(reply.content, CONNECTION_FALLBACK);
    }

    #[test]
    fn test_connect_without_key_is_offline() {
        let assistant = Assistant::connect(
            FactorTable::builtin(),
            Err(ProviderError::Unavailable("no key".to_string())),
        );
        assert!(!assistant.is_delegated());

        let assistant = Assistant::connect(FactorTable::builtin(), Ok(AIConfig::default()));
        assert!(!assistant.is_delegated());
    }

    #[test]
    fn test_announce_result_only_when_delegated() {
        let offline = Assistant::offline(FactorTable::builtin());
        let mut state = calculated_state();
        assert!(offline.announce_result(&mut state).is_none());
        assert!(state.messages().is_empty());

        let (delegated, _) = recording("ok");
        let message = delegated.announce_result(&mut state).unwrap();
        assert!(message.content.contains("Your total emissions are 1.95 tonnes CO2/year"));
        assert!(message.content.contains("above the India average of 1.9"));
        assert!(message.content.contains("Your highest emission category is Diet."));
        assert_eq!(state.messages().len(), 1);
    }

    #[test]
    fn test_announce_result_below_average() {
        let (delegated, _) = recording("ok");
        let mut state = ConversationState::new(Region::UnitedStates);
        let footprint = FootprintResult {
            transportation: 1.0,
            electricity: 1.0,
            diet: 1.0,
            waste: 1.0,
            total: 4.0,
        };
        state.record_footprint(Region::UnitedStates, footprint);

        let message = delegated.announce_result(&mut state).unwrap();
        assert!(message.content.contains("below the United States average of 15.2"));
        assert!(message.content.contains("Great job!"));
    }
}
