use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use agentcore_identifiers::PersonaId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaBinding {
    pub platform: String,
    pub platform_server_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub id: PersonaId,
    pub system_prompt: String,
    pub allowed_modules: BTreeSet<String>,
    pub default_model: Option<String>,
    pub max_tokens_per_request: Option<u32>,
    pub is_default: bool,
    pub binding: Option<PersonaBinding>,
}

impl Persona {
    #[must_use]
    pub fn matches_binding(&self, platform: &str, platform_server_id: Option<&str>) -> bool {
        match (&self.binding, platform_server_id) {
            (Some(binding), Some(server_id)) => {
                binding.platform == platform && binding.platform_server_id == server_id
            },
            (Some(binding), None) => binding.platform == platform,
            (None, _) => false,
        }
    }
}

/// Resolution order for §4.5 step 3: server-bound persona, then platform-bound,
/// then the global default, then none.
#[must_use]
pub fn resolve_persona<'a>(
    personas: &'a [Persona],
    platform: &str,
    platform_server_id: Option<&str>,
) -> Option<&'a Persona> {
    if let Some(server_id) = platform_server_id {
        if let Some(bound) = personas.iter().find(|p| {
            p.binding
                .as_ref()
                .is_some_and(|b| b.platform == platform && b.platform_server_id == server_id)
        }) {
            return Some(bound);
        }
    }

    if let Some(bound) = personas.iter().find(|p| {
        p.binding
            .as_ref()
            .is_some_and(|b| b.platform == platform && platform_server_id.is_none())
    }) {
        return Some(bound);
    }

    personas.iter().find(|p| p.is_default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona(id: PersonaId, binding: Option<PersonaBinding>, is_default: bool) -> Persona {
        Persona {
            id,
            system_prompt: "prompt".to_string(),
            allowed_modules: BTreeSet::new(),
            default_model: None,
            max_tokens_per_request: None,
            is_default,
            binding,
        }
    }

    #[test]
    fn prefers_server_bound_over_default() {
        let default = persona(PersonaId::generate(), None, true);
        let bound = persona(
            PersonaId::generate(),
            Some(PersonaBinding {
                platform: "discord".to_string(),
                platform_server_id: "srv-1".to_string(),
            }),
            false,
        );
        let personas = vec![default.clone(), bound.clone()];
        let resolved = resolve_persona(&personas, "discord", Some("srv-1")).expect("resolved");
        assert_eq!(resolved.id, bound.id);
    }

    #[test]
    fn falls_back_to_default_persona() {
        let default = persona(PersonaId::generate(), None, true);
        let personas = vec![default.clone()];
        let resolved = resolve_persona(&personas, "discord", Some("srv-1")).expect("resolved");
        assert_eq!(resolved.id, default.id);
    }

    #[test]
    fn none_when_nothing_matches() {
        let personas: Vec<Persona> = vec![];
        assert!(resolve_persona(&personas, "discord", None).is_none());
    }
}
