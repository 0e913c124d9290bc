use std::collections::BTreeSet;
use std::sync::{Mutex, RwLock};

use pollmcp_core::resources::{Resource, ResourceContents, ResourceTemplate};

const TEXT_PLAIN: &str = "text/plain";

/// In-memory resource catalogue with per-URI subscriptions.
pub struct MockResources {
    resources: RwLock<Vec<Resource>>,
    templates: Vec<ResourceTemplate>,
    subscriptions: Mutex<BTreeSet<String>>,
}

impl Default for MockResources {
    fn default() -> Self {
        Self::new()
    }
}

impl MockResources {
    pub fn new() -> Self {
        Self {
            resources: RwLock::new(vec![
                Resource {
                    uri: "test://static/resource/1".to_string(),
                    name: "Static Resource 1".to_string(),
                    description: Some("This is a static plaintext resource".to_string()),
                    mime_type: TEXT_PLAIN.to_string(),
                    last_updated: None,
                },
                Resource {
                    uri: "test://static/resource/2".to_string(),
                    name: "Static Resource 2".to_string(),
                    description: Some("A second plaintext resource that changes over time".to_string()),
                    mime_type: TEXT_PLAIN.to_string(),
                    last_updated: None,
                },
            ]),
            templates: vec![ResourceTemplate {
                uri_template: "test://text/resource/{id}".to_string(),
                name: "Template Text Resource".to_string(),
                description: Some("A template resource with text content".to_string()),
            }],
            subscriptions: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn list(&self) -> Vec<Resource> {
        self.resources
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn templates(&self) -> Vec<ResourceTemplate> {
        self.templates.clone()
    }

    fn template_for(&self, uri: &str) -> Option<&ResourceTemplate> {
        self.templates.iter().find(|template| {
            let prefix = template
                .uri_template
                .split('{')
                .next()
                .unwrap_or(&template.uri_template);
            uri.len() > prefix.len() && uri.starts_with(prefix)
        })
    }

    fn exists(&self, uri: &str) -> bool {
        self.list().iter().any(|r| r.uri == uri) || self.template_for(uri).is_some()
    }

    /// Contents of a concrete resource or a URI matching a template.
    pub fn read(&self, uri: &str) -> Option<ResourceContents> {
        if let Some(resource) = self.list().into_iter().find(|r| r.uri == uri) {
            let text = match &resource.last_updated {
                Some(at) => format!(
                    "{} (updated {at})",
                    resource.description.as_deref().unwrap_or(&resource.name)
                ),
                None => resource.description.unwrap_or(resource.name),
            };
            return Some(ResourceContents {
                uri: resource.uri,
                mime_type: resource.mime_type,
                text,
            });
        }

        let template = self.template_for(uri)?;
        Some(ResourceContents {
            uri: uri.to_string(),
            mime_type: TEXT_PLAIN.to_string(),
            text: template
                .description
                .clone()
                .unwrap_or_else(|| template.name.clone()),
        })
    }

    /// False when the URI names no resource.
    pub fn subscribe(&self, uri: &str) -> bool {
        if !self.exists(uri) {
            return false;
        }
        self.subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(uri.to_string());
        true
    }

    /// False when there was no subscription for the URI.
    pub fn unsubscribe(&self, uri: &str) -> bool {
        self.subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(uri)
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Stamp every resource as changed at `now` and return the subscribed
    /// URIs among them.
    pub fn touch_all(&self, now: &str) -> Vec<String> {
        let subscribed = self.subscriptions();
        let mut resources = self.resources.write().unwrap_or_else(|e| e.into_inner());
        resources
            .iter_mut()
            .filter_map(|resource| {
                resource.last_updated = Some(now.to_string());
                subscribed.contains(&resource.uri).then(|| resource.uri.clone())
            })
            .collect()
    }
}
