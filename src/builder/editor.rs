use serde_json::Value;
use tracing::{debug, info};

use super::content::{Feature, MainModule, ProposalContent, SubModule};
use super::legacy::merge_modules;
use crate::client::ApiClient;
use crate::errors::{BuilderError, BuilderResult, ClientResult};

/// Address of one feature inside `featuresByRole`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeaturePath {
    pub role: String,
    pub module: usize,
    pub sub_module: usize,
    pub feature: usize,
}

impl FeaturePath {
    pub fn new(role: impl Into<String>, module: usize, sub_module: usize, feature: usize) -> Self {
        Self {
            role: role.into(),
            module,
            sub_module,
            feature,
        }
    }
}

/// A proposal being edited. Edits only touch memory and mark the draft dirty;
/// [`ProposalDraft::save`] writes the whole content back in one request.
#[derive(Clone, Debug, PartialEq)]
pub struct ProposalDraft {
    proposal_id: String,
    content: ProposalContent,
    dirty: bool,
}

fn at_mut<'a, T>(items: &'a mut [T], index: usize, kind: &'static str) -> BuilderResult<&'a mut T> {
    items
        .get_mut(index)
        .ok_or(BuilderError::OutOfRange { kind, index })
}

fn remove_at<T>(items: &mut Vec<T>, index: usize, kind: &'static str) -> BuilderResult<T> {
    if index >= items.len() {
        return Err(BuilderError::OutOfRange { kind, index });
    }
    Ok(items.remove(index))
}

impl ProposalDraft {
    pub fn new(proposal_id: impl Into<String>, content: ProposalContent) -> Self {
        Self {
            proposal_id: proposal_id.into(),
            content,
            dirty: false,
        }
    }

    pub fn proposal_id(&self) -> &str {
        &self.proposal_id
    }

    pub fn content(&self) -> &ProposalContent {
        &self.content
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Direct access for edits not covered by the helpers below.
    pub fn content_mut(&mut self) -> &mut ProposalContent {
        self.dirty = true;
        &mut self.content
    }

    fn modules_mut(&mut self, role: &str) -> BuilderResult<&mut Vec<MainModule>> {
        self.content
            .features_by_role
            .get_mut(role)
            .ok_or_else(|| BuilderError::UnknownRole(role.to_string()))
    }

    fn module_mut(&mut self, role: &str, module: usize) -> BuilderResult<&mut MainModule> {
        at_mut(self.modules_mut(role)?, module, "main module")
    }

    fn sub_module_mut(
        &mut self,
        role: &str,
        module: usize,
        sub_module: usize,
    ) -> BuilderResult<&mut SubModule> {
        let module = self.module_mut(role, module)?;
        at_mut(&mut module.sub_modules, sub_module, "sub-module")
    }

    fn feature_mut(&mut self, path: &FeaturePath) -> BuilderResult<&mut Feature> {
        let sub = self.sub_module_mut(&path.role, path.module, path.sub_module)?;
        at_mut(&mut sub.features, path.feature, "feature")
    }

    fn touched<T>(&mut self, result: T) -> T {
        self.dirty = true;
        result
    }

    pub fn add_role(&mut self, role: &str) -> BuilderResult<()> {
        if self.content.features_by_role.contains_key(role) {
            return Err(BuilderError::DuplicateRole(role.to_string()));
        }
        self.content
            .features_by_role
            .insert(role.to_string(), Vec::new());
        Ok(self.touched(()))
    }

    pub fn remove_role(&mut self, role: &str) -> BuilderResult<Vec<MainModule>> {
        let removed = self
            .content
            .features_by_role
            .shift_remove(role)
            .ok_or_else(|| BuilderError::UnknownRole(role.to_string()))?;
        Ok(self.touched(removed))
    }

    /// Rename a role in place, keeping its position and its feature tree.
    pub fn rename_role(&mut self, role: &str, new_name: &str) -> BuilderResult<()> {
        if role == new_name {
            return Ok(());
        }
        if self.content.features_by_role.contains_key(new_name) {
            return Err(BuilderError::DuplicateRole(new_name.to_string()));
        }
        let index = self
            .content
            .features_by_role
            .get_index_of(role)
            .ok_or_else(|| BuilderError::UnknownRole(role.to_string()))?;
        let modules = self
            .content
            .features_by_role
            .shift_remove(role)
            .unwrap_or_default();
        self.content
            .features_by_role
            .shift_insert(index, new_name.to_string(), modules);
        Ok(self.touched(()))
    }

    /// Append an empty main module and return its index.
    pub fn add_main_module(&mut self, role: &str, name: &str) -> BuilderResult<usize> {
        let modules = self.modules_mut(role)?;
        modules.push(MainModule {
            name: name.to_string(),
            sub_modules: Vec::new(),
        });
        let index = modules.len() - 1;
        Ok(self.touched(index))
    }

    /// Merge a catalog module into the role; same-named modules are joined.
    pub fn add_catalog_module(&mut self, role: &str, module: MainModule) -> BuilderResult<()> {
        debug!("adding catalog module {} to {}", module.name, role);
        merge_modules(self.modules_mut(role)?, vec![module]);
        Ok(self.touched(()))
    }

    pub fn remove_main_module(&mut self, role: &str, module: usize) -> BuilderResult<MainModule> {
        let removed = remove_at(self.modules_mut(role)?, module, "main module")?;
        Ok(self.touched(removed))
    }

    pub fn rename_main_module(&mut self, role: &str, module: usize, name: &str) -> BuilderResult<()> {
        self.module_mut(role, module)?.name = name.to_string();
        Ok(self.touched(()))
    }

    pub fn add_sub_module(&mut self, role: &str, module: usize, name: &str) -> BuilderResult<usize> {
        let module = self.module_mut(role, module)?;
        module.sub_modules.push(SubModule {
            name: name.to_string(),
            features: Vec::new(),
        });
        let index = module.sub_modules.len() - 1;
        Ok(self.touched(index))
    }

    pub fn remove_sub_module(
        &mut self,
        role: &str,
        module: usize,
        sub_module: usize,
    ) -> BuilderResult<SubModule> {
        let module = self.module_mut(role, module)?;
        let removed = remove_at(&mut module.sub_modules, sub_module, "sub-module")?;
        Ok(self.touched(removed))
    }

    pub fn rename_sub_module(
        &mut self,
        role: &str,
        module: usize,
        sub_module: usize,
        name: &str,
    ) -> BuilderResult<()> {
        self.sub_module_mut(role, module, sub_module)?.name = name.to_string();
        Ok(self.touched(()))
    }

    /// Append a feature with no mandays and return its full path.
    pub fn add_feature(
        &mut self,
        role: &str,
        module: usize,
        sub_module: usize,
        name: &str,
    ) -> BuilderResult<FeaturePath> {
        let sub = self.sub_module_mut(role, module, sub_module)?;
        sub.features.push(Feature {
            name: name.to_string(),
            ..Default::default()
        });
        let path = FeaturePath::new(role, module, sub_module, sub.features.len() - 1);
        Ok(self.touched(path))
    }

    pub fn remove_feature(&mut self, path: &FeaturePath) -> BuilderResult<Feature> {
        let sub = self.sub_module_mut(&path.role, path.module, path.sub_module)?;
        let removed = remove_at(&mut sub.features, path.feature, "feature")?;
        Ok(self.touched(removed))
    }

    pub fn rename_feature(&mut self, path: &FeaturePath, name: &str) -> BuilderResult<()> {
        self.feature_mut(path)?.name = name.to_string();
        Ok(self.touched(()))
    }

    pub fn set_mandays(&mut self, path: &FeaturePath, mandays: f64) -> BuilderResult<()> {
        self.feature_mut(path)?.mandays = mandays;
        Ok(self.touched(()))
    }

    pub fn add_condition(&mut self, path: &FeaturePath, text: &str) -> BuilderResult<usize> {
        let feature = self.feature_mut(path)?;
        feature.conditions.push(text.to_string());
        let index = feature.conditions.len() - 1;
        Ok(self.touched(index))
    }

    pub fn update_condition(
        &mut self,
        path: &FeaturePath,
        index: usize,
        text: &str,
    ) -> BuilderResult<()> {
        let feature = self.feature_mut(path)?;
        *at_mut(&mut feature.conditions, index, "condition")? = text.to_string();
        Ok(self.touched(()))
    }

    pub fn remove_condition(&mut self, path: &FeaturePath, index: usize) -> BuilderResult<String> {
        let feature = self.feature_mut(path)?;
        let removed = remove_at(&mut feature.conditions, index, "condition")?;
        Ok(self.touched(removed))
    }

    /// Write the whole content back with a single PUT and clear the dirty flag.
    pub async fn save(&mut self, api: &ApiClient) -> ClientResult<Value> {
        self.content.apply_payment_totals();
        let saved = api
            .save_proposal_content(&self.proposal_id, &self.content.to_value())
            .await?;
        self.dirty = false;
        info!("Saved proposal {}", self.proposal_id);
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ProposalDraft {
        let mut content = ProposalContent::default();
        content
            .features_by_role
            .insert("Sales".to_string(), Vec::new());
        content
            .features_by_role
            .insert("Admin".to_string(), Vec::new());
        ProposalDraft::new("proposal-abc123", content)
    }

    #[test]
    fn building_a_feature_tree() {
        let mut draft = draft();
        assert!(!draft.is_dirty());

        let module = draft.add_main_module("Sales", "Account").unwrap();
        let sub = draft.add_sub_module("Sales", module, "Auth").unwrap();
        let login = draft.add_feature("Sales", module, sub, "Login").unwrap();
        draft.set_mandays(&login, 2.0).unwrap();
        draft.add_condition(&login, "OTP via SMS").unwrap();
        let logout = draft.add_feature("Sales", module, sub, "Logout").unwrap();
        draft.set_mandays(&logout, 0.5).unwrap();

        assert!(draft.is_dirty());
        assert_eq!(logout, FeaturePath::new("Sales", 0, 0, 1));
        assert_eq!(draft.content().role_mandays("Sales"), 2.5);
        assert_eq!(
            draft.content().features_by_role["Sales"][0].sub_modules[0].features[0].conditions,
            vec!["OTP via SMS"]
        );
    }

    #[test]
    fn renames_and_removals() {
        let mut draft = draft();
        let module = draft.add_main_module("Admin", "Reprts").unwrap();
        let sub = draft.add_sub_module("Admin", module, "Sales").unwrap();
        let feature = draft.add_feature("Admin", module, sub, "Exprt").unwrap();
        draft.add_condition(&feature, "CSV").unwrap();

        draft.rename_main_module("Admin", module, "Reports").unwrap();
        draft.rename_feature(&feature, "Export").unwrap();
        draft.update_condition(&feature, 0, "CSV and XLSX").unwrap();

        let tree = &draft.content().features_by_role["Admin"];
        assert_eq!(tree[0].name, "Reports");
        assert_eq!(tree[0].sub_modules[0].features[0].name, "Export");
        assert_eq!(tree[0].sub_modules[0].features[0].conditions, vec!["CSV and XLSX"]);

        assert_eq!(draft.remove_condition(&feature, 0).unwrap(), "CSV and XLSX");
        assert_eq!(draft.remove_feature(&feature).unwrap().name, "Export");
        assert_eq!(draft.remove_sub_module("Admin", module, sub).unwrap().name, "Sales");
        assert_eq!(draft.remove_main_module("Admin", module).unwrap().name, "Reports");
        assert!(draft.content().features_by_role["Admin"].is_empty());
    }

    #[test]
    fn out_of_range_paths_are_errors() {
        let mut draft = draft();
        assert_eq!(
            draft.add_sub_module("Sales", 0, "Auth"),
            Err(BuilderError::OutOfRange {
                kind: "main module",
                index: 0
            })
        );
        assert_eq!(
            draft.add_main_module("Finance", "Billing"),
            Err(BuilderError::UnknownRole("Finance".to_string()))
        );

        let module = draft.add_main_module("Sales", "Account").unwrap();
        let sub = draft.add_sub_module("Sales", module, "Auth").unwrap();
        let feature = draft.add_feature("Sales", module, sub, "Login").unwrap();
        assert_eq!(
            draft.remove_condition(&feature, 2),
            Err(BuilderError::OutOfRange {
                kind: "condition",
                index: 2
            })
        );
        assert_eq!(
            draft.set_mandays(&FeaturePath::new("Sales", 0, 0, 5), 1.0),
            Err(BuilderError::OutOfRange {
                kind: "feature",
                index: 5
            })
        );
    }

    #[test]
    fn role_rename_keeps_position() {
        let mut draft = draft();
        draft.add_role("Customer").unwrap();
        assert_eq!(
            draft.add_role("Sales"),
            Err(BuilderError::DuplicateRole("Sales".to_string()))
        );

        draft.rename_role("Sales", "Sales Rep").unwrap();
        let roles: Vec<&String> = draft.content().features_by_role.keys().collect();
        assert_eq!(roles, vec!["Sales Rep", "Admin", "Customer"]);

        assert_eq!(
            draft.rename_role("Admin", "Customer"),
            Err(BuilderError::DuplicateRole("Customer".to_string()))
        );
        draft.remove_role("Customer").unwrap();
        assert_eq!(draft.content().features_by_role.len(), 2);
    }

    #[test]
    fn catalog_modules_merge_by_name() {
        let mut draft = draft();
        let module = draft.add_main_module("Sales", "Account").unwrap();
        draft.add_sub_module("Sales", module, "Authentication").unwrap();

        let catalog = crate::catalog::search_modules(Some("account"));
        draft
            .add_catalog_module("Sales", catalog[0].clone())
            .unwrap();

        let tree = &draft.content().features_by_role["Sales"];
        assert_eq!(tree.len(), 1);
        assert!(!tree[0].sub_modules[0].features.is_empty());
    }
}
