//! HTML page for the interactive shell

use crate::render::{embed_srcdoc, escape_html};
use crate::shell::{
    edge_source_field, edge_target_field, ShellStage, View, FIELD_ESTIMATE, FIELD_NODES,
    FIELD_OUTCOME, FIELD_TREATMENT,
};
use uuid::Uuid;

const TITLE: &str = "CausalIQ - No-Code Causal Inference Platform";

fn options(values: &[String], selected: &[&String]) -> String {
    values
        .iter()
        .map(|value| {
            let escaped = escape_html(value);
            let mark = if selected.contains(&value) { " selected" } else { "" };
            format!("<option value=\"{}\"{}>{}</option>", escaped, mark, escaped)
        })
        .collect()
}

fn select_box(name: &str, label: &str, values: &[String], selected: Option<&String>) -> String {
    let selected: Vec<&String> = selected.into_iter().collect();
    format!(
        "<label>{label}<select name=\"{name}\" onchange=\"this.form.submit()\">{options}</select></label>",
        label = escape_html(label),
        name = name,
        options = options(values, &selected),
    )
}

fn preview_table(view: &View) -> String {
    let Some(preview) = &view.preview else {
        return String::new();
    };

    let header: String = preview
        .columns
        .iter()
        .map(|c| format!("<th>{}</th>", escape_html(c)))
        .collect();
    let body: String = preview
        .rows
        .iter()
        .map(|row| {
            let cells: String = row
                .iter()
                .map(|cell| format!("<td>{}</td>", escape_html(cell)))
                .collect();
            format!("<tr>{}</tr>", cells)
        })
        .collect();

    format!(
        "<h2>Preview of Uploaded Data</h2>\
         <table><thead><tr>{}</tr></thead><tbody>{}</tbody></table>\
         <p>{} rows total</p>",
        header, body, preview.row_count
    )
}

fn graph_form(session: Uuid, view: &View) -> String {
    let selected_nodes: Vec<&String> = view.nodes.iter().collect();
    let mut form = format!(
        "<form method=\"post\" action=\"/sessions/{session}\">\
         <h3>2. Define Causal Graph (DAG)</h3>\
         <input type=\"hidden\" name=\"{nodes}\" value=\"\">\
         <label>Select variables (nodes)\
         <select name=\"{nodes}\" multiple onchange=\"this.form.submit()\">{options}</select></label>\
         <h4>Add Edges (Cause &rarr; Effect)</h4>",
        session = session,
        nodes = FIELD_NODES,
        options = options(&view.columns, &selected_nodes),
    );

    for (slot, edge) in view.edge_slots.iter().enumerate() {
        form.push_str(&select_box(
            &edge_source_field(slot),
            &format!("Edge {} - Source", slot + 1),
            &view.nodes,
            edge.source.as_ref(),
        ));
        form.push_str(&select_box(
            &edge_target_field(slot),
            &format!("Edge {} - Target", slot + 1),
            &view.nodes,
            edge.target.as_ref(),
        ));
    }

    if view.stage >= ShellStage::GraphDefined {
        form.push_str("<h3>3. Select Treatment and Outcome</h3>");
        form.push_str(&select_box(
            FIELD_TREATMENT,
            "Select Treatment Variable",
            &view.treatment_options,
            view.treatment.as_ref(),
        ));
        form.push_str(&select_box(
            FIELD_OUTCOME,
            "Select Outcome Variable",
            &view.outcome_options,
            view.outcome.as_ref(),
        ));
        form.push_str(&format!(
            "<button type=\"submit\" name=\"{}\" value=\"1\">Estimate Causal Effect</button>",
            FIELD_ESTIMATE
        ));
    }

    form.push_str("</form>");
    form
}

/// Renders the full page for a session
pub fn render_page(session: Uuid, view: &View) -> String {
    let upload = format!(
        "<form method=\"post\" action=\"/sessions/{}/dataset\" enctype=\"multipart/form-data\">\
         <h3>1. Upload Dataset</h3>\
         <input type=\"file\" name=\"file\" accept=\".csv,text/csv\">\
         <button type=\"submit\">Upload CSV</button></form>",
        session
    );

    let mut sidebar = upload;
    let mut main = String::new();

    if view.stage != ShellStage::Initial {
        sidebar.push_str(&graph_form(session, view));
        main.push_str(&preview_table(view));
    }

    if let Some(html) = &view.dag_html {
        main.push_str("<h2>Visualized DAG</h2>");
        main.push_str(&embed_srcdoc(html));
    }

    if let Some(text) = view.estimate_text() {
        main.push_str("<h2>Estimated Causal Effect</h2>");
        main.push_str(&format!("<pre>{}</pre>", escape_html(&text)));
        main.push_str("<p class=\"success\">Analysis Complete!</p>");
    }

    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title>\
         <style>body{{display:flex;font-family:sans-serif;margin:0}}\
         aside{{width:22rem;padding:1rem;background:#f0f2f6}}\
         main{{flex:1;padding:1rem}}label{{display:block;margin:.5rem 0}}\
         select{{display:block;width:100%}}table{{border-collapse:collapse}}\
         td,th{{border:1px solid #ddd;padding:.25rem .5rem}}.success{{color:green}}</style>\
         </head><body><aside>{sidebar}</aside><main><h1>{title}</h1>{main}</main></body></html>",
        title = TITLE,
        sidebar = sidebar,
        main = main,
    )
}
