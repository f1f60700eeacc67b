//! Tool catalog listing.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use nirvania_core::tool::catalog::ToolSpec;
use nirvania_types::tool::{ToolEffect, ToolName};

/// Print every registered tool with its effect class and slash command.
pub fn list_tools(json: bool) -> Result<()> {
    let specs: Vec<ToolSpec> = ToolName::ALL.into_iter().map(ToolSpec::for_name).collect();

    if json {
        let out: Vec<serde_json::Value> = specs.iter().map(spec_json).collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Tool").fg(Color::White),
        Cell::new("Effect").fg(Color::White),
        Cell::new("Command").fg(Color::White),
        Cell::new("Description").fg(Color::White),
    ]);

    for spec in &specs {
        let effect_cell = match spec.effect {
            ToolEffect::ReadOnly => Cell::new("read-only").fg(Color::Green),
            ToolEffect::Mutating => Cell::new("mutating").fg(Color::Yellow),
        };
        table.add_row(vec![
            Cell::new(spec.name.as_str()),
            effect_cell,
            Cell::new(spec.slash_command).fg(Color::Cyan),
            Cell::new(spec.description),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {}",
        style("Mutating tools are simulated unless a run passes --live.").dim()
    );
    println!();
    Ok(())
}

fn spec_json(spec: &ToolSpec) -> serde_json::Value {
    serde_json::json!({
        "name": spec.name.as_str(),
        "effect": spec.effect,
        "slash_command": spec.slash_command,
        "description": spec.description,
        "example": spec.example,
        "input_schema": spec.input_schema,
    })
}
