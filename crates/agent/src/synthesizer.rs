//! Response synthesis after the shopper answers the personalization question.
//!
//! The answer decides the branch. `yes` (any case, surrounding whitespace
//! ignored) fetches the shopper's profile and asks the model to rank the last
//! search results for them. Any other answer gets a plain listing of the
//! results without calling the model. With no usable results the shopper gets
//! [`NO_RESULTS_MESSAGE`] either way.

use shopassist_core::catalog::{Product, UserProfile};
use shopassist_core::error::Result;
use shopassist_core::message::{History, Message, Role};
use shopassist_core::provider::ProviderRequest;
use shopassist_core::state::{AgentState, StateUpdate};
use shopassist_providers::ModelHandle;
use shopassist_tools::ProfileSource;
use tracing::{debug, info, warn};

pub const NO_RESULTS_MESSAGE: &str = "I couldn't find any products matching your search.";

const LISTING_HEADER: &str = "Here are the products I found:\n\n";

/// The output of the most recent resolved `search` call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults {
    pub call_id: String,
    /// The tool output as the model would see it
    pub raw: String,
    pub products: Vec<Product>,
}

/// Find the nearest assistant message with a resolved `search` call and
/// decode its output.
///
/// Outputs are looked up by call id. An error-flagged, undecodable or empty
/// output counts as no results.
pub fn find_search_results(history: &History) -> Option<SearchResults> {
    let (call_id, output) = history
        .iter()
        .rev()
        .filter(|m| m.role == Role::Assistant)
        .flat_map(|m| m.tool_calls.iter().filter(|tc| tc.name == "search"))
        .find_map(|tc| history.tool_output(&tc.id).map(|out| (tc.id.clone(), out)))?;

    if output.is_error {
        debug!(call_id = %call_id, "Last search failed");
        return None;
    }

    let products: Vec<Product> = match serde_json::from_str(&output.content) {
        Ok(products) => products,
        Err(e) => {
            warn!(call_id = %call_id, error = %e, "Search output is not a product list");
            return None;
        }
    };

    if products.is_empty() {
        return None;
    }

    Some(SearchResults {
        call_id,
        raw: output.content.clone(),
        products,
    })
}

/// Whether `answer` accepts personalization.
pub fn wants_personalization(answer: Option<&Message>) -> bool {
    answer.is_some_and(|m| m.content.trim().eq_ignore_ascii_case("yes"))
}

/// Prompt asking the model to rank `results` for `profile`.
pub fn personalization_prompt(profile: &UserProfile, results: &SearchResults) -> String {
    let interests: Vec<&str> = profile.interests.iter().map(String::as_str).collect();

    format!(
        "Given the following user profile and search results, provide personalized product recommendations.\n\
         Rank the products by relevance to the user and add a one-sentence explanation for each recommendation.\n\
         \n\
         User Profile:\n\
         - Age: {age}\n\
         - Occupation: {occupation}\n\
         - Interests: {interests}\n\
         - Recent Purchases: {purchases}\n\
         \n\
         Search Results:\n\
         {results}\n\
         \n\
         Present the recommendations in a clear format, ranked by relevance to the user's profile, \
         each with one sentence on why it suits this user.",
        age = profile.age,
        occupation = profile.occupation,
        interests = interests.join(", "),
        purchases = profile.purchase_names().join(", "),
        results = results.raw,
    )
}

/// Plain listing of `products`, in the order given.
pub fn format_listing(products: &[Product]) -> String {
    let mut out = String::from(LISTING_HEADER);
    for p in products {
        out.push_str(&format!("- {}\n", p.title));
        out.push_str(&format!("  Price: {:.2}\n", p.price));
        match &p.subcategory {
            Some(sub) => out.push_str(&format!("  Category: {} > {sub}\n", p.category)),
            None => out.push_str(&format!("  Category: {}\n", p.category)),
        }
        out.push_str(&format!("  Description: {}\n", p.description));
        out.push_str(&format!("  Image: {}\n", p.image_url));
        out.push_str(&format!("  Link: {}\n\n", p.link_url));
    }
    out.trim_end().to_string()
}

/// What the synthesizer did, for logging and events.
#[derive(Debug)]
pub struct Synthesis {
    pub update: StateUpdate,
    pub personalized: bool,
    pub product_count: usize,
}

/// Produces the final answer of a personalization turn.
pub struct Synthesizer<'a> {
    pub model: &'a ModelHandle,
    pub profiles: &'a dyn ProfileSource,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Synthesizer<'_> {
    /// Build the update for `state`, whose last message is the shopper's answer.
    ///
    /// The update always clears the awaiting-answer flag.
    pub async fn synthesize(&self, state: &AgentState) -> Result<Synthesis> {
        let mut update = StateUpdate::new().awaiting_answer(false);

        let Some(results) = find_search_results(state.history()) else {
            info!("No search results to present");
            return Ok(Synthesis {
                update: update.message(Message::assistant(NO_RESULTS_MESSAGE)),
                personalized: false,
                product_count: 0,
            });
        };
        let product_count = results.products.len();

        if wants_personalization(state.last_message()) {
            match self.profiles.find_user().await {
                Ok(profile) => {
                    let reply = self.personalize(&profile, &results).await?;
                    update = update.user_profile(profile);
                    if let Some(message) = reply {
                        return Ok(Synthesis {
                            update: update.message(message),
                            personalized: true,
                            product_count,
                        });
                    }
                    warn!("Model returned an empty recommendation, listing results instead");
                }
                Err(e) => warn!(error = %e, "Profile lookup failed, listing results instead"),
            }
        }

        Ok(Synthesis {
            update: update.message(Message::assistant(format_listing(&results.products))),
            personalized: false,
            product_count,
        })
    }

    /// One model call over the augmented prompt alone, without the conversation.
    /// `None` when the model answers with blank text.
    async fn personalize(
        &self,
        profile: &UserProfile,
        results: &SearchResults,
    ) -> Result<Option<Message>> {
        debug!(call_id = %results.call_id, model = %self.model.model, "Requesting personalized ranking");

        let request = ProviderRequest {
            model: self.model.model.clone(),
            messages: vec![Message::user(personalization_prompt(profile, results))],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: vec![],
        };

        let response = self.model.provider.complete(request).await?;
        let content = response.message.content;
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(Message::assistant(content)))
    }
}
