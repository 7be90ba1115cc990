// src/services/template_registry.rs
use log::{error, info};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog;
use crate::errors::TravelAgentError;
use crate::models::{Platform, TemplateForm, TemplateOption};
use crate::services::template_store::TemplateStore;

/// Built-in plus user-defined prompt templates for every platform.
///
/// Built-ins always lead each list and are never modified or removed, so
/// every platform has at least one template. User-defined templates are
/// appended after them and mirrored to the [`TemplateStore`] on each change.
pub struct TemplateRegistry {
    templates: BTreeMap<Platform, Vec<TemplateOption>>,
    store: Arc<dyn TemplateStore>,
}

impl TemplateRegistry {
    /// Reads user-defined templates once. Any read or parse failure is
    /// logged and the registry starts with built-ins only.
    pub async fn load(store: Arc<dyn TemplateStore>) -> Self {
        let mut templates: BTreeMap<Platform, Vec<TemplateOption>> = Platform::ALL
            .into_iter()
            .map(|p| (p, catalog::builtin_templates(p)))
            .collect();

        let stored = match store.load().await {
            Ok(Some(json)) => match parse_user_templates(&json) {
                Ok(stored) => stored,
                Err(e) => {
                    error!("Failed to load custom templates: {}", e);
                    BTreeMap::new()
                }
            },
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                error!("Failed to load custom templates: {}", e);
                BTreeMap::new()
            }
        };

        for (platform, custom) in stored {
            if let Some(list) = templates.get_mut(&platform) {
                // Stored entries may not shadow a built-in id.
                let custom: Vec<TemplateOption> = custom
                    .into_iter()
                    .filter(|t| !list.iter().any(|b| b.id == t.id))
                    .collect();
                info!("Loaded {} custom templates for {}", custom.len(), platform);
                list.extend(custom);
            }
        }

        Self { templates, store }
    }

    pub fn templates(&self, platform: Platform) -> &[TemplateOption] {
        self.templates
            .get(&platform)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The template with `selected_id`, or the platform's built-in default.
    pub fn resolve_active_template(&self, platform: Platform, selected_id: &str) -> &TemplateOption {
        let list = self.templates(platform);
        list.iter()
            .find(|t| t.id == selected_id)
            .unwrap_or(&list[0])
    }

    pub fn resolve_all(
        &self,
        selected: &BTreeMap<Platform, String>,
    ) -> BTreeMap<Platform, TemplateOption> {
        Platform::ALL
            .into_iter()
            .map(|p| {
                let id = selected.get(&p).map(String::as_str).unwrap_or_default();
                (p, self.resolve_active_template(p, id).clone())
            })
            .collect()
    }

    /// Saves the form as a user-defined template.
    ///
    /// A form opened from a user-defined template replaces it in place.
    /// Anything else, including a form claiming an id that is not one of the
    /// platform's user-defined templates, becomes a new entry with a fresh id.
    pub async fn upsert_user_template(
        &mut self,
        platform: Platform,
        form: TemplateForm,
    ) -> Result<TemplateOption, TravelAgentError> {
        if form.name.trim().is_empty() || form.prompt_body.trim().is_empty() {
            return Err(TravelAgentError::Validation(
                "Template name and prompt must not be empty".to_string(),
            ));
        }

        let replaces_existing = form.is_user_defined
            && self
                .templates(platform)
                .iter()
                .any(|t| t.is_user_defined && t.id == form.id);
        let id = if replaces_existing {
            form.id
        } else {
            format!("custom-{}", Uuid::new_v4().simple())
        };
        let template = TemplateOption {
            id,
            name: form.name,
            prompt_body: form.prompt_body,
            is_user_defined: true,
        };

        let mut updated = self.templates(platform).to_vec();
        match updated
            .iter_mut()
            .find(|t| t.is_user_defined && t.id == template.id)
        {
            Some(existing) => *existing = template.clone(),
            None => updated.push(template.clone()),
        }

        self.commit(platform, updated).await?;
        info!("Saved custom template {} for {}", template.id, platform);
        Ok(template)
    }

    /// Removes a user-defined template. Built-ins and unknown ids are left
    /// alone and reported as `false`.
    pub async fn delete_user_template(
        &mut self,
        platform: Platform,
        id: &str,
    ) -> Result<bool, TravelAgentError> {
        let list = self.templates(platform);
        if !list.iter().any(|t| t.is_user_defined && t.id == id) {
            return Ok(false);
        }

        let updated: Vec<TemplateOption> = list
            .iter()
            .filter(|t| !(t.is_user_defined && t.id == id))
            .cloned()
            .collect();
        self.commit(platform, updated).await?;
        info!("Deleted custom template {} for {}", id, platform);
        Ok(true)
    }

    /// Persists the registry as it would look with `updated` in place, then
    /// swaps it in. A failed write leaves the registry untouched.
    async fn commit(
        &mut self,
        platform: Platform,
        updated: Vec<TemplateOption>,
    ) -> Result<(), TravelAgentError> {
        let mut next = self.templates.clone();
        next.insert(platform, updated);

        let json = serialize_user_templates(&next)?;
        self.store.save(&json).await?;

        self.templates = next;
        Ok(())
    }
}

fn serialize_user_templates(
    templates: &BTreeMap<Platform, Vec<TemplateOption>>,
) -> Result<String, TravelAgentError> {
    let customs: BTreeMap<&str, Vec<&TemplateOption>> = templates
        .iter()
        .filter_map(|(platform, list)| {
            let own: Vec<&TemplateOption> = list.iter().filter(|t| t.is_user_defined).collect();
            (!own.is_empty()).then(|| (platform.slug(), own))
        })
        .collect();
    Ok(serde_json::to_string(&customs)?)
}

fn parse_user_templates(
    json: &str,
) -> Result<BTreeMap<Platform, Vec<TemplateOption>>, TravelAgentError> {
    let raw: HashMap<String, Vec<TemplateOption>> = serde_json::from_str(json)?;
    let mut parsed = BTreeMap::new();
    for (key, list) in raw {
        let Ok(platform) = key.parse::<Platform>() else {
            continue;
        };
        let list: Vec<TemplateOption> = list
            .into_iter()
            .map(|t| TemplateOption {
                is_user_defined: true,
                ..t
            })
            .collect();
        parsed.insert(platform, list);
    }
    Ok(parsed)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    pub(crate) struct MemoryTemplateStore {
        pub entry: Mutex<Option<String>>,
        pub fail_writes: AtomicBool,
    }

    impl MemoryTemplateStore {
        pub fn with_entry(json: &str) -> Self {
            Self {
                entry: Mutex::new(Some(json.to_string())),
                fail_writes: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl TemplateStore for MemoryTemplateStore {
        async fn load(&self) -> Result<Option<String>, TravelAgentError> {
            Ok(self.entry.lock().unwrap().clone())
        }

        async fn save(&self, json: &str) -> Result<(), TravelAgentError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(TravelAgentError::Storage("disk full".into()));
            }
            *self.entry.lock().unwrap() = Some(json.to_string());
            Ok(())
        }
    }

    fn form(id: &str, name: &str, body: &str, is_user_defined: bool) -> TemplateForm {
        TemplateForm {
            id: id.into(),
            name: name.into(),
            prompt_body: body.into(),
            is_user_defined,
        }
    }

    async fn registry() -> (TemplateRegistry, Arc<MemoryTemplateStore>) {
        let store = Arc::new(MemoryTemplateStore::default());
        (TemplateRegistry::load(store.clone()).await, store)
    }

    #[tokio::test]
    async fn test_unknown_id_resolves_to_builtin_default() {
        let (registry, _) = registry().await;
        for platform in Platform::ALL {
            let resolved = registry.resolve_active_template(platform, "does-not-exist");
            assert_eq!(resolved.id, catalog::default_template_id(platform));
            assert!(!resolved.is_user_defined);
        }
    }

    #[tokio::test]
    async fn test_resolves_selected_template() {
        let (registry, _) = registry().await;
        let resolved = registry.resolve_active_template(Platform::Red, "red-diary");
        assert_eq!(resolved.name, "Personal Diary (碎碎念)");
    }

    #[tokio::test]
    async fn test_editing_builtin_creates_copy() {
        let (mut registry, store) = registry().await;
        let builtin = registry.templates(Platform::WeChat)[0].clone();
        let before = registry.templates(Platform::WeChat).len();

        let edited = form(&builtin.id, &builtin.name, "Style: my own", false);
        let saved = registry
            .upsert_user_template(Platform::WeChat, edited)
            .await
            .unwrap();

        assert_ne!(saved.id, builtin.id);
        assert!(saved.id.starts_with("custom-"));
        assert!(saved.is_user_defined);
        assert_eq!(registry.templates(Platform::WeChat).len(), before + 1);
        assert_eq!(registry.templates(Platform::WeChat)[0], builtin);
        assert_eq!(catalog::builtin_templates(Platform::WeChat)[0], builtin);

        let persisted = store.entry.lock().unwrap().clone().unwrap();
        assert!(persisted.contains("\"wechat\""));
        assert!(!persisted.contains("wechat-standard"));
    }

    #[tokio::test]
    async fn test_editing_user_template_replaces_in_place() {
        let (mut registry, _) = registry().await;
        let saved = registry
            .upsert_user_template(Platform::Red, form("", "Mine", "Style: a", false))
            .await
            .unwrap();
        let len = registry.templates(Platform::Red).len();

        let updated = registry
            .upsert_user_template(Platform::Red, form(&saved.id, "Mine v2", "Style: b", true))
            .await
            .unwrap();

        assert_eq!(updated.id, saved.id);
        let list = registry.templates(Platform::Red);
        assert_eq!(list.len(), len);
        assert_eq!(list.last().unwrap().name, "Mine v2");
        assert_eq!(list.last().unwrap().prompt_body, "Style: b");
    }

    #[tokio::test]
    async fn test_user_form_with_builtin_id_gets_fresh_id() {
        let (mut registry, store) = registry().await;
        let builtins = catalog::builtin_templates(Platform::WeChat);

        let saved = registry
            .upsert_user_template(
                Platform::WeChat,
                form("wechat-standard", "Mine", "Style: x", true),
            )
            .await
            .unwrap();
        assert!(saved.id.starts_with("custom-"));
        assert_eq!(
            registry
                .templates(Platform::WeChat)
                .iter()
                .filter(|t| t.id == "wechat-standard")
                .count(),
            1
        );

        assert!(
            !registry
                .delete_user_template(Platform::WeChat, "wechat-standard")
                .await
                .unwrap()
        );
        assert!(
            registry
                .delete_user_template(Platform::WeChat, &saved.id)
                .await
                .unwrap()
        );
        assert_eq!(registry.templates(Platform::WeChat), builtins.as_slice());
        assert_eq!(store.entry.lock().unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_unknown_user_id_is_not_kept() {
        let (mut registry, _) = registry().await;
        let saved = registry
            .upsert_user_template(Platform::Red, form("custom-made-up", "Mine", "Style: a", true))
            .await
            .unwrap();
        assert_ne!(saved.id, "custom-made-up");
        assert_eq!(registry.templates(Platform::Red).len(), 4);
    }

    #[tokio::test]
    async fn test_stored_entry_cannot_shadow_builtin() {
        let json = r#"{"douyin":[{"id":"douyin-standard","name":"Fake","promptBody":"x"},
            {"id":"custom-b","name":"B","promptBody":"Style: b"}]}"#;
        let mut registry =
            TemplateRegistry::load(Arc::new(MemoryTemplateStore::with_entry(json))).await;

        let douyin = registry.templates(Platform::Douyin);
        assert_eq!(douyin.len(), 3);
        assert_eq!(douyin[0], catalog::builtin_templates(Platform::Douyin)[0]);
        assert!(
            !registry
                .delete_user_template(Platform::Douyin, "douyin-standard")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_blank_form_is_rejected() {
        let (mut registry, _) = registry().await;
        let err = registry
            .upsert_user_template(Platform::Weibo, form("", "  ", "body", false))
            .await
            .unwrap_err();
        assert!(matches!(err, TravelAgentError::Validation(_)));
        assert_eq!(registry.templates(Platform::Weibo).len(), 3);
    }

    #[tokio::test]
    async fn test_deleting_builtin_is_noop() {
        let (mut registry, store) = registry().await;
        let before = registry.templates(Platform::Douyin).to_vec();

        let deleted = registry
            .delete_user_template(Platform::Douyin, "douyin-standard")
            .await
            .unwrap();

        assert!(!deleted);
        assert_eq!(registry.templates(Platform::Douyin), before.as_slice());
        assert!(store.entry.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deleting_user_template_repersists() {
        let (mut registry, store) = registry().await;
        let saved = registry
            .upsert_user_template(Platform::Douyin, form("", "Mine", "Style: x", false))
            .await
            .unwrap();

        assert!(
            registry
                .delete_user_template(Platform::Douyin, &saved.id)
                .await
                .unwrap()
        );
        assert_eq!(registry.templates(Platform::Douyin).len(), 2);
        assert_eq!(store.entry.lock().unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_persisted_template_round_trips() {
        let (mut registry, store) = registry().await;
        let saved = registry
            .upsert_user_template(Platform::Weibo, form("", "Night", "Vibe: quiet", false))
            .await
            .unwrap();

        let reloaded = TemplateRegistry::load(store.clone()).await;
        let found = reloaded
            .templates(Platform::Weibo)
            .iter()
            .find(|t| t.id == saved.id)
            .unwrap();
        assert_eq!(found, &saved);
        assert!(found.is_user_defined);
    }

    #[tokio::test]
    async fn test_malformed_storage_falls_back_to_builtins() {
        let store = Arc::new(MemoryTemplateStore::with_entry("{not json"));
        let registry = TemplateRegistry::load(store).await;
        for platform in Platform::ALL {
            assert_eq!(
                registry.templates(platform),
                catalog::builtin_templates(platform).as_slice()
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_platform_keys_are_ignored() {
        let json = r#"{"instagram":[{"id":"x","name":"x","promptBody":"x"}],
            "red":[{"id":"custom-a","name":"A","promptBody":"Style: a"}]}"#;
        let registry = TemplateRegistry::load(Arc::new(MemoryTemplateStore::with_entry(json))).await;

        let red = registry.templates(Platform::Red);
        assert_eq!(red.len(), 4);
        assert!(red[3].is_user_defined);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_registry_unchanged() {
        let (mut registry, store) = registry().await;
        store.fail_writes.store(true, Ordering::SeqCst);

        let err = registry
            .upsert_user_template(Platform::Red, form("", "Mine", "Style: a", false))
            .await
            .unwrap_err();

        assert!(matches!(err, TravelAgentError::Storage(_)));
        assert_eq!(registry.templates(Platform::Red).len(), 3);
    }
}
