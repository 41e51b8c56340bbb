//! Provider registry.
//!
//! Maps provider names to connection parameters. Names the catalog does not
//! know resolve to a custom provider with no endpoint, and such a provider
//! cannot be validated. Resolution reports which of the two happened so a
//! later "no base URL" validation failure can be traced back to it.

mod catalog;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Prefix for ids of synthesized custom providers.
const CUSTOM_ID_PREFIX: &str = "custom:";

/// Description given to synthesized custom providers.
const CUSTOM_DESCRIPTION: &str = "Custom API provider";

/// Stable provider identifier.
///
/// Catalog providers use a slug of their name (`openai`); custom providers
/// use `custom:<lowercased name>`. Both are deterministic so stored
/// references survive restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    /// Wrap an existing id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the catalog id for a provider name.
    pub fn from_name(name: &str) -> Self {
        let slug: String = name
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect();
        Self(slug)
    }

    /// Id of the custom provider synthesized for `name`.
    pub fn custom(name: &str) -> Self {
        Self(format!("{CUSTOM_ID_PREFIX}{}", name.trim().to_lowercase()))
    }

    /// Whether this id refers to a synthesized custom provider.
    pub fn is_custom(&self) -> bool {
        self.0.starts_with(CUSTOM_ID_PREFIX)
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection parameters for a remote API provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub name: String,
    pub homepage: String,
    pub base_url: String,
    pub description: String,
    pub default_model: String,
}

impl Provider {
    /// Create a catalog provider; the id is derived from the name.
    pub fn new(
        name: impl Into<String>,
        homepage: impl Into<String>,
        base_url: impl Into<String>,
        description: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            id: ProviderId::from_name(&name),
            name,
            homepage: homepage.into(),
            base_url: base_url.into(),
            description: description.into(),
            default_model: default_model.into(),
        }
    }

    /// Whether a validation call can be made (the base URL is set).
    pub fn is_validatable(&self) -> bool {
        !self.base_url.trim().is_empty()
    }

    /// Whether this is a synthesized custom provider.
    pub fn is_custom(&self) -> bool {
        self.id.is_custom()
    }
}

/// Outcome of resolving a provider name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderResolution {
    /// The name matched a catalog entry.
    Known(Provider),
    /// The name is unknown; a custom provider without endpoint was synthesized.
    Custom(Provider),
}

impl ProviderResolution {
    /// The resolved provider.
    pub fn provider(&self) -> &Provider {
        match self {
            Self::Known(p) | Self::Custom(p) => p,
        }
    }

    /// Consume the resolution, returning the provider.
    pub fn into_provider(self) -> Provider {
        match self {
            Self::Known(p) | Self::Custom(p) => p,
        }
    }

    /// Whether resolution fell back to a custom provider.
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

/// Queryable catalog of known providers.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: Vec<Provider>,
}

impl ProviderRegistry {
    /// Registry holding the built-in catalog.
    pub fn builtin() -> Self {
        Self::with_providers(catalog::builtin_providers())
    }

    /// Registry holding exactly `providers`.
    pub fn with_providers(providers: Vec<Provider>) -> Self {
        Self { providers }
    }

    /// Add entries, replacing any catalog entry with the same name.
    pub fn with_overrides(mut self, overrides: Vec<Provider>) -> Self {
        for provider in overrides {
            match self
                .providers
                .iter_mut()
                .find(|p| names_match(&p.name, &provider.name))
            {
                Some(existing) => {
                    debug!(provider = %provider.name, "overriding catalog provider");
                    *existing = provider;
                }
                None => self.providers.push(provider),
            }
        }
        self
    }

    /// All catalog providers in catalog order.
    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    /// Case-insensitive exact lookup by name.
    pub fn find_by_name(&self, name: &str) -> Option<&Provider> {
        self.providers.iter().find(|p| names_match(&p.name, name))
    }

    /// Lookup by provider id.
    pub fn find_by_id(&self, id: &ProviderId) -> Option<&Provider> {
        self.providers.iter().find(|p| &p.id == id)
    }

    /// Synthesize a provider for an unrecognized name. It has no endpoint.
    pub fn create_custom(name: &str) -> Provider {
        Provider {
            id: ProviderId::custom(name),
            name: name.to_string(),
            homepage: String::new(),
            base_url: String::new(),
            description: CUSTOM_DESCRIPTION.to_string(),
            default_model: String::new(),
        }
    }

    /// Resolve a provider name against the catalog.
    pub fn resolve(&self, name: &str) -> ProviderResolution {
        match self.find_by_name(name) {
            Some(provider) => ProviderResolution::Known(provider.clone()),
            None => {
                warn!(provider = %name, "unknown provider, using custom provider without endpoint");
                ProviderResolution::Custom(Self::create_custom(name))
            }
        }
    }

    /// Resolve a stored provider reference, falling back to the name.
    ///
    /// A `custom:` reference always yields the endpoint-less custom
    /// provider, even if the catalog later gains an entry with that name.
    pub fn resolve_reference(
        &self,
        reference: Option<&ProviderId>,
        name: &str,
    ) -> ProviderResolution {
        let Some(id) = reference else {
            return self.resolve(name);
        };
        if id.is_custom() {
            return ProviderResolution::Custom(Self::create_custom(name));
        }
        if let Some(provider) = self.find_by_id(id) {
            return ProviderResolution::Known(provider.clone());
        }
        debug!(provider_id = %id, provider = %name, "stored provider reference not in catalog");
        self.resolve(name)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn names_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
