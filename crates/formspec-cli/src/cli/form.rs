//! Form CLI commands: list, plan, check, run.

use anyhow::{bail, Context, Result};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use formspec_core::factory::{FormError, FormFactory};
use formspec_core::graph::validate_form_graph;
use formspec_core::plan::{ExecutionPlan, Operation};
use formspec_core::surface::PromptSurface;
use serde_json::{json, Map, Value};

const MASK: &str = "********";

/// List every form in the catalog with its compiled shape.
pub fn list_forms<S: PromptSurface>(factory: &FormFactory<S>, json: bool) -> Result<()> {
    let rows: Vec<_> = factory
        .catalog()
        .type_names()
        .map(|name| (name.to_string(), factory.plan(name)))
        .collect();

    if json {
        let forms: Vec<Value> = rows
            .iter()
            .map(|(name, plan)| match plan {
                Ok(plan) => json!({
                    "form": name,
                    "operations": plan.operations.len(),
                    "dependencies": plan.dependencies.iter().map(|d| &d.name).collect::<Vec<_>>(),
                    "async": plan.is_async(),
                }),
                Err(err) => json!({ "form": name, "error": err.to_string() }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&forms)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!();
        println!("  {} No forms in the catalog.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Form").fg(Color::White),
        Cell::new("Operations").fg(Color::White),
        Cell::new("Dependencies").fg(Color::White),
        Cell::new("Mode").fg(Color::White),
    ]);

    for (name, plan) in &rows {
        match plan {
            Ok(plan) => {
                let deps = if plan.dependencies.is_empty() {
                    "-".to_string()
                } else {
                    plan.dependencies
                        .iter()
                        .map(|d| d.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                let mode = if plan.is_async() {
                    Cell::new("async").fg(Color::Cyan)
                } else {
                    Cell::new("sync").fg(Color::Green)
                };
                table.add_row(vec![
                    Cell::new(name).fg(Color::Cyan),
                    Cell::new(plan.operations.len()),
                    Cell::new(deps),
                    mode,
                ]);
            }
            Err(err) => {
                table.add_row(vec![
                    Cell::new(name).fg(Color::Cyan),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new(format!("✗ {err}")).fg(Color::Red),
                ]);
            }
        }
    }

    println!("{table}");
    Ok(())
}

/// Compile a form and print its execution plan.
pub fn show_plan<S: PromptSurface>(factory: &FormFactory<S>, form: &str, json: bool) -> Result<()> {
    let plan = factory
        .plan(form)
        .with_context(|| format!("Failed to compile form '{form}'"))?;
    let summary = plan.summary();

    if json {
        let out = json!({
            "form": plan.type_name,
            "culture": plan.culture,
            "constructor": plan.strategy,
            "dependencies": plan.dependencies,
            "async": plan.is_async(),
            "operations": summary,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Plan for {}",
        style("▸").bold(),
        style(&plan.type_name).cyan().bold()
    );
    if !plan.dependencies.is_empty() {
        let deps: Vec<String> = plan
            .dependencies
            .iter()
            .map(|d| match &d.declared_type {
                Some(ty) => format!("{} ({ty})", d.name),
                None => d.name.clone(),
            })
            .collect();
        println!("  {} {}", style("Requires:").bold(), deps.join(", "));
    }
    println!();

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").fg(Color::White),
        Cell::new("Member").fg(Color::White),
        Cell::new("Operation").fg(Color::White),
        Cell::new("Detail").fg(Color::White),
    ]);
    for (i, row) in summary.iter().enumerate() {
        let member = format!("{}{}", "  ".repeat(row.depth), row.path);
        table.add_row(vec![
            Cell::new(i + 1).fg(Color::DarkGrey),
            Cell::new(member).fg(Color::Cyan),
            Cell::new(row.operation),
            Cell::new(&row.detail),
        ]);
    }
    println!("{table}");
    println!();
    Ok(())
}

/// Compile every form and validate the nested-form graph.
pub fn check_forms<S: PromptSurface>(factory: &FormFactory<S>, json: bool) -> Result<()> {
    let order = validate_form_graph(factory.catalog()).context("Nested-form graph is invalid")?;

    let results: Vec<(String, Option<String>)> = order
        .into_iter()
        .map(|name| {
            let error = factory.plan(&name).err().map(|e| e.to_string());
            (name, error)
        })
        .collect();
    let failed = results.iter().filter(|(_, err)| err.is_some()).count();

    if json {
        let out: Vec<Value> = results
            .iter()
            .map(|(name, err)| json!({ "form": name, "ok": err.is_none(), "error": err }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!();
        for (name, err) in &results {
            match err {
                None => println!("  {} {}", style("✓").green(), name),
                Some(err) => println!("  {} {}: {}", style("✗").red(), name, style(err).red()),
            }
        }
        println!();
    }

    if failed > 0 {
        bail!("{failed} of {} forms failed to compile", results.len());
    }
    Ok(())
}

/// Build a form interactively and print the populated instance.
pub async fn run_form<S: PromptSurface>(
    factory: &FormFactory<S>,
    form: &str,
    sets: &[String],
    json: bool,
) -> Result<()> {
    let supplied = parse_assignments(sets)?;
    let plan = factory
        .plan(form)
        .with_context(|| format!("Failed to compile form '{form}'"))?;

    match factory.build(form, supplied).await {
        Ok(instance) => {
            let mut values = instance.to_value();
            mask_secrets(&plan, &mut values);
            if json {
                let out = json!({ "form": form, "state": "completed", "values": values });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!();
                println!(
                    "  {} {} completed",
                    style("✓").green().bold(),
                    style(form).cyan().bold()
                );
                println!();
                println!("{}", serde_json::to_string_pretty(&values)?);
                println!();
            }
            Ok(())
        }
        Err(FormError::Run(failure)) => {
            let mut partial = failure.partial.to_value();
            mask_secrets(&plan, &mut partial);
            if json {
                let out = json!({
                    "form": form,
                    "state": failure.state,
                    "run_id": failure.run_id,
                    "failed_member": failure.error.member(),
                    "error": failure.error.to_string(),
                    "partial": partial,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else if failure.error.is_cancelled() {
                eprintln!();
                eprintln!(
                    "  {} Cancelled at '{}'",
                    style("!").yellow().bold(),
                    failure.error.member()
                );
                eprintln!();
            } else {
                eprintln!();
                eprintln!(
                    "  {} {} failed at '{}'",
                    style("✗").red().bold(),
                    style(form).cyan(),
                    failure.error.member()
                );
                eprintln!("  {}", style(serde_json::to_string(&partial)?).dim());
                eprintln!();
            }
            Err(FormError::Run(failure).into())
        }
        Err(err) => Err(err).with_context(|| format!("Failed to run form '{form}'")),
    }
}

/// Parse `name=value` pairs. Values are read as JSON, falling back to a
/// plain string.
pub fn parse_assignments(sets: &[String]) -> Result<Map<String, Value>> {
    let mut supplied = Map::new();
    for set in sets {
        let Some((name, raw)) = set.split_once('=') else {
            bail!("Invalid --set '{set}': expected NAME=VALUE");
        };
        let name = name.trim();
        if name.is_empty() {
            bail!("Invalid --set '{set}': name must not be empty");
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        supplied.insert(name.to_string(), value);
    }
    Ok(supplied)
}

/// Replace the values of secret text members, nested forms included.
fn mask_secrets(plan: &ExecutionPlan, values: &mut Value) {
    let Value::Object(fields) = values else {
        return;
    };
    for op in &plan.operations {
        match op {
            Operation::AskText {
                member,
                secret: true,
                ..
            } => {
                if let Some(value) = fields.get_mut(member) {
                    if !value.is_null() {
                        *value = Value::String(MASK.to_string());
                    }
                }
            }
            Operation::Recurse { member, plan } => {
                if let Some(child) = fields.get_mut(member) {
                    mask_secrets(plan, child);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::demo_catalog;
    use formspec_core::compiler::FormCompiler;

    #[test]
    fn test_parse_assignments() {
        let sets = vec![
            "inviter=ada".to_string(),
            "teams=[\"core\",\"web\"]".to_string(),
            "count=3".to_string(),
            "note=a=b".to_string(),
        ];
        let supplied = parse_assignments(&sets).unwrap();
        assert_eq!(supplied["inviter"], json!("ada"));
        assert_eq!(supplied["teams"], json!(["core", "web"]));
        assert_eq!(supplied["count"], json!(3));
        assert_eq!(supplied["note"], json!("a=b"));
    }

    #[test]
    fn test_parse_assignments_rejects_malformed() {
        assert!(parse_assignments(&["novalue".to_string()]).is_err());
        assert!(parse_assignments(&["=x".to_string()]).is_err());
    }

    #[test]
    fn test_mask_secrets() {
        let catalog = demo_catalog().unwrap();
        let plan = FormCompiler::new(&catalog, 16).compile("Signup").unwrap();
        let mut values = json!({
            "username": "ada",
            "password": "hunter2",
            "profile": { "display_name": "Ada" },
        });
        mask_secrets(&plan, &mut values);
        assert_eq!(values["password"], json!(MASK));
        assert_eq!(values["username"], json!("ada"));
        assert_eq!(values["profile"]["display_name"], json!("Ada"));
    }
}
