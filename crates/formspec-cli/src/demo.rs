//! Built-in demo catalog: declarations from `forms/demo.yaml` plus the
//! Rust bindings for their sources, converters and steps.

use std::time::Duration;

use anyhow::{Context, Result};
use formspec_core::binding::FormBindings;
use formspec_core::catalog::FormCatalog;
use formspec_types::error::StepError;
use serde_json::{json, Value};
use uuid::Uuid;

const DEMO_CATALOG: &str = include_str!("../forms/demo.yaml");

const REGIONS: &[(&str, &str)] = &[
    ("eu-west", "Europe (Ireland)"),
    ("us-east", "US East (Virginia)"),
    ("ap-south", "Asia Pacific (Mumbai)"),
];

/// Load the demo declarations and bind their callables.
pub fn demo_catalog() -> Result<FormCatalog> {
    let mut catalog =
        FormCatalog::from_yaml(DEMO_CATALOG).context("Failed to parse built-in demo catalog")?;
    catalog
        .bind("Signup", signup_bindings())
        .bind("Invite", invite_bindings());
    Ok(catalog)
}

fn signup_bindings() -> FormBindings {
    FormBindings::new()
        .source("regions", |_| {
            Ok(REGIONS.iter().map(|(code, _)| json!(code)).collect())
        })
        .converter("region_label", |value| {
            let code = value.as_str().unwrap_or_default();
            REGIONS
                .iter()
                .find(|(c, _)| *c == code)
                .map(|(_, label)| format!("{label} [{code}]"))
                .unwrap_or_else(|| code.to_string())
        })
        .async_step("register", |instance| {
            Box::pin(async move {
                let username = instance
                    .get_str("username")
                    .filter(|name| !name.trim().is_empty())
                    .ok_or_else(|| StepError::failed("username must not be blank"))?
                    .to_string();

                // Stand-in for a remote account service
                tokio::time::sleep(Duration::from_millis(600)).await;

                let account_id = format!("acct-{}", Uuid::now_v7().simple());
                tracing::info!(
                    username = username.as_str(),
                    account_id = account_id.as_str(),
                    "account registered"
                );
                instance.set("account_id", account_id);
                Ok::<(), StepError>(())
            })
        })
}

fn invite_bindings() -> FormBindings {
    FormBindings::new().step("send", |instance| {
        let email = instance.get_str("email").unwrap_or_default();
        if !email.contains('@') {
            return Err(StepError::failed(format!("'{email}' is not an email address")));
        }
        instance.set("sent", Value::Bool(true));
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use formspec_core::compiler::FormCompiler;
    use formspec_core::graph::validate_form_graph;
    use formspec_core::binding::{BoundMethod, StepHandle};
    use formspec_core::plan::Operation;
    use formspec_types::instance::FormInstance;

    #[test]
    fn test_demo_catalog_compiles() {
        let catalog = demo_catalog().unwrap();
        assert_eq!(catalog.len(), 3);
        let compiler = FormCompiler::new(&catalog, 16);
        for name in catalog.type_names() {
            compiler.compile(name).unwrap();
        }
        let order = validate_form_graph(&catalog).unwrap();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("Profile") < pos("Signup"));
    }

    #[test]
    fn test_signup_plan_shape() {
        let catalog = demo_catalog().unwrap();
        let plan = FormCompiler::new(&catalog, 16).compile("Signup").unwrap();
        let members: Vec<&str> = plan.operations.iter().map(Operation::member).collect();
        assert_eq!(members, vec!["username", "password", "region", "profile", "register"]);
        assert!(plan.is_async());
    }

    #[test]
    fn test_invite_plan_is_sync_with_dependencies() {
        let catalog = demo_catalog().unwrap();
        let plan = FormCompiler::new(&catalog, 16).compile("Invite").unwrap();
        assert!(!plan.is_async());
        let deps: Vec<&str> = plan.dependencies.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(deps, vec!["inviter", "teams"]);
    }

    #[test]
    fn test_region_labels() {
        let catalog = demo_catalog().unwrap();
        let bound = catalog.bindings("Signup").and_then(|b| b.get("region_label"));
        let Some(BoundMethod::Converter(render)) = bound else {
            panic!("region_label should be a converter");
        };
        assert_eq!(render(&json!("eu-west")), "Europe (Ireland) [eu-west]");
        assert_eq!(render(&json!("mars")), "mars");
    }

    #[test]
    fn test_send_rejects_bad_email() {
        let catalog = demo_catalog().unwrap();
        let bound = catalog.bindings("Invite").and_then(|b| b.get("send"));
        let Some(BoundMethod::Step(StepHandle::Sync(send))) = bound else {
            panic!("send should be a sync step");
        };
        let mut invite = FormInstance::new("Invite");
        invite.set("email", "nobody");
        assert!(send(&mut invite).is_err());
        invite.set("email", "bob@example.com");
        send(&mut invite).unwrap();
        assert_eq!(invite.get("sent"), Some(&json!(true)));
    }
}
