//! Proposal builder: reconciles saved content with the template, migrates
//! legacy shapes and edits the per-role feature tree in memory.

pub mod content;
pub mod editor;
pub mod legacy;
pub mod mandays;
pub mod template;

pub use content::{
    EnginePair, Feature, FinancialSection, LineItem, MainModule, PaymentTerm, ProposalContent,
    SubModule, SystemEnvironment,
};
pub use editor::{FeaturePath, ProposalDraft};
pub use legacy::{has_legacy_features, migrate_legacy_features};
pub use mandays::{is_mandays_input, MandaysField};
pub use template::{reconstruct_pairs, ProposalTemplate};

use serde_json::Value;
use tracing::debug;

use crate::client::ApiClient;
use crate::common::deep_merge;
use crate::errors::{BuilderError, BuilderResult, ClientError, ClientResult};
use crate::models::Role;

/// Build the editable content for a proposal from what the server returned.
///
/// Legacy keys are migrated first, then the saved blob is deep-merged over the
/// defaults for `roles`. Empty payment terms and engine pairs are refilled from
/// the template.
pub fn load_content(
    mut saved: Value,
    template: &ProposalTemplate,
    roles: &[Role],
) -> BuilderResult<ProposalContent> {
    if saved.is_null() {
        saved = Value::Object(Default::default());
    }
    if !saved.is_object() {
        return Err(BuilderError::InvalidContent(
            "proposal content must be a JSON object".to_string(),
        ));
    }
    migrate_legacy_features(&mut saved);

    let mut merged = ProposalContent::default_for(roles, template).to_value();
    deep_merge(&mut merged, saved);
    let mut content: ProposalContent = serde_json::from_value(merged)?;

    if content.terms_of_payment.is_empty() {
        debug!("no payment terms saved, using template defaults");
        content.terms_of_payment = template.terms_of_payment.clone();
    }
    if content.system_environment.pairs.is_empty() {
        content.system_environment.pairs = template.pairs();
    }
    Ok(content)
}

/// Fetch the template, the project's roles and the saved content of a
/// proposal and open it as a draft.
pub async fn open_draft(api: &ApiClient, proposal_id: &str) -> ClientResult<ProposalDraft> {
    let proposal = api.get_proposal(proposal_id).await?;
    let project = api.get_project(&proposal.project_id).await?;
    let template = api.get_proposal_template().await?;
    let saved = api.get_proposal_content(proposal_id).await?;

    let content = load_content(saved, &template, &project.roles)
        .map_err(|e| ClientError::Decode(e.to_string()))?;
    Ok(ProposalDraft::new(proposal_id, content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roles() -> Vec<Role> {
        vec![
            Role {
                name: "Sales".to_string(),
                platforms: vec!["Android".to_string()],
            },
            Role {
                name: "Admin".to_string(),
                platforms: vec!["Web".to_string()],
            },
        ]
    }

    #[test]
    fn empty_content_gets_template_defaults() {
        let template = ProposalTemplate::builtin();
        let content = load_content(json!({}), &template, &roles()).unwrap();

        assert_eq!(content.terms_of_payment.len(), 3);
        assert_eq!(content.system_environment.pairs, template.pairs());
        let roles: Vec<&String> = content.features_by_role.keys().collect();
        assert_eq!(roles, vec!["Sales", "Admin"]);
    }

    #[test]
    fn saved_values_win_and_null_keeps_default() {
        let template = ProposalTemplate::builtin();
        let content = load_content(
            json!({
                "termsAndConditions": ["Custom term"],
                "termsOfPayment": null,
                "systemEnvironment": {"platforms": ["iOS"]}
            }),
            &template,
            &roles(),
        )
        .unwrap();

        assert_eq!(content.terms_and_conditions, vec!["Custom term"]);
        assert_eq!(content.terms_of_payment, template.terms_of_payment);
        assert_eq!(content.system_environment.platforms, vec!["iOS"]);
        assert!(!content.system_environment.pairs.is_empty());
    }

    #[test]
    fn empty_saved_lists_are_refilled() {
        let template = ProposalTemplate::builtin();
        let content = load_content(
            json!({"termsOfPayment": [], "systemEnvironment": {"pairs": []}}),
            &template,
            &[],
        )
        .unwrap();
        assert_eq!(content.terms_of_payment.len(), 3);
        assert_eq!(content.system_environment.pairs.len(), 4);
    }

    #[test]
    fn legacy_content_is_migrated_on_load() {
        let content = load_content(
            json!({
                "featureSales": [{"mainModule": "Account", "subModule": "Auth", "feature": "Login", "mandays": 2}]
            }),
            &ProposalTemplate::builtin(),
            &roles(),
        )
        .unwrap();

        assert!(!content.extra.contains_key("featureSales"));
        assert_eq!(content.role_mandays("Sales"), 2.0);
        assert!(content.features_by_role["Admin"].is_empty());
    }

    #[test]
    fn non_object_content_is_rejected() {
        let err = load_content(json!([1, 2]), &ProposalTemplate::default(), &[]).unwrap_err();
        assert!(matches!(err, BuilderError::InvalidContent(_)));
    }
}
