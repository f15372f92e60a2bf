//! Template registry storage

use std::collections::HashMap;

use crate::category::{ContentCategory, StatusOption};
use crate::error::{Error, Result};
use crate::field::FieldKey;
use crate::template::FieldTemplate;

/// Lookup table of field templates, partitioned by category.
///
/// Pure lookups: unknown `(category, key)` pairs return `None` and the
/// caller decides whether that is fatal.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: HashMap<ContentCategory, Vec<FieldTemplate>>,
}

impl TemplateRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Create a registry pre-populated with the built-in template sets.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for category in ContentCategory::ALL {
            for template in super::builtins::builtin_templates(category) {
                registry.register(category, template);
            }
        }
        registry
    }

    /// Register a template, replacing any template with the same key.
    pub fn register(&mut self, category: ContentCategory, template: FieldTemplate) {
        let set = self.templates.entry(category).or_default();
        match set.iter_mut().find(|t| t.key == template.key) {
            Some(existing) => *existing = template,
            None => set.push(template),
        }
    }

    pub fn template_for(&self, category: ContentCategory, key: FieldKey) -> Option<&FieldTemplate> {
        self.templates
            .get(&category)?
            .iter()
            .find(|t| t.key == key)
    }

    pub fn is_supported(&self, key: FieldKey, category: ContentCategory) -> bool {
        self.template_for(category, key).is_some()
    }

    /// Ordered status options of a category.
    pub fn status_options_for(&self, category: ContentCategory) -> &'static [StatusOption] {
        category.status_options()
    }

    /// All templates of a category in registration order.
    pub fn templates_for(&self, category: ContentCategory) -> &[FieldTemplate] {
        self.templates
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Resolve explicitly requested field names into templates.
    ///
    /// Unlike the lookups above, an unknown or unsupported name is an error
    /// because the caller asked for it by name.
    pub fn resolve<S: AsRef<str>>(
        &self,
        category: ContentCategory,
        names: &[S],
    ) -> Result<Vec<FieldTemplate>> {
        names
            .iter()
            .map(|name| {
                let key: FieldKey = name.as_ref().parse()?;
                self.template_for(category, key)
                    .cloned()
                    .ok_or_else(|| Error::FieldNotInCategory {
                        key: key.to_string(),
                        category: category.to_string(),
                    })
            })
            .collect()
    }

    /// Find the template whose logical name equals `name` exactly.
    pub fn template_named(&self, category: ContentCategory, name: &str) -> Option<&FieldTemplate> {
        self.templates_for(category).iter().find(|t| t.name == name)
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
