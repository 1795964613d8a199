//! Classification prompt construction
//!
//! Pure functions of a deployment policy and the request text; the router only
//! calls them when the policy has at least one valid category.

use crate::policy::DeploymentPolicy;

/// One line per valid category in stored order: `- {name}[ - {context}]`
pub fn format_category_listing(policy: &DeploymentPolicy) -> String {
    let mut listing = String::new();
    for category in policy.valid_categories() {
        listing.push_str("- ");
        listing.push_str(category.name());
        if let Some(context) = category.prompt_context() {
            listing.push_str(" - ");
            listing.push_str(context);
        }
        listing.push('\n');
    }
    listing.trim().to_string()
}

/// Comma-separated valid category names, deduplicated
pub fn format_category_names(policy: &DeploymentPolicy) -> String {
    policy.available_categories().join(", ")
}

/// Build the full classification prompt for `content`
pub fn build_classification_prompt(policy: &DeploymentPolicy, content: &str) -> String {
    format!(
        "You are a strict classifier. These are the available categories:\n{}\n\n\
         Respond with ONLY one of these category names: {}\n\
         If the request doesn't clearly fit any category, respond 'NONE'.\n\
         Request: {}",
        format_category_listing(policy),
        format_category_names(policy),
        content
    )
}
