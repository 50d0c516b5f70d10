//! HTML fragments returned to HTMX requests.
//!
//! Full-page responses are JSON; only the partial-refresh front end receives
//! markup, so the fragments here stay small: the list table (or its body),
//! card grids, form panels and the production order detail.

use serde::Serialize;
use std::fmt::Write;
use uuid::Uuid;

use crate::services::dashboard::DashboardCounts;
use crate::services::listing::{ListParams, SortDir};
use crate::services::production_orders::ProductionOrderDetail;

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// One rendered page of a listing.
pub struct TableView<'a> {
    pub base: &'a str,
    pub headers: &'a [&'a str],
    pub ids: Vec<Uuid>,
    pub rows: Vec<Vec<String>>,
    pub params: &'a ListParams,
    pub page: u64,
    pub num_pages: u64,
    pub total: u64,
}

impl TableView<'_> {
    fn query_for_page(&self, page: u64) -> String {
        let dir = match self.params.dir {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        };
        let q: String = url::form_urlencoded::byte_serialize(self.params.search.as_bytes()).collect();
        format!(
            "?q={}&sort={}&dir={}&page={}&per_page={}&view={}",
            q, self.params.sort, dir, page, self.params.per_page, self.params.view
        )
    }
}

pub fn table_body(base: &str, ids: &[Uuid], rows: &[Vec<String>]) -> String {
    let mut html = String::from("<tbody id=\"datatable-body\">");
    for (id, row) in ids.iter().zip(rows) {
        let _ = write!(
            html,
            "<tr data-id=\"{id}\"><td><input type=\"checkbox\" name=\"ids\" value=\"{id}\"></td>"
        );
        for cell in row {
            let _ = write!(html, "<td>{}</td>", escape(cell));
        }
        let _ = write!(
            html,
            "<td><a hx-get=\"{base}/{id}/edit/\">Edit</a> \
             <button hx-post=\"{base}/{id}/delete/\">Delete</button></td></tr>"
        );
    }
    if ids.is_empty() {
        html.push_str("<tr class=\"empty\"><td colspan=\"99\">No records</td></tr>");
    }
    html.push_str("</tbody>");
    html
}

fn pagination(view: &TableView<'_>) -> String {
    let mut html = format!(
        "<nav class=\"pagination\" data-total=\"{}\"><span>Page {} of {}</span>",
        view.total, view.page, view.num_pages
    );
    if view.page > 1 {
        let _ = write!(
            html,
            "<a hx-get=\"{}/{}\">Previous</a>",
            view.base,
            escape(&view.query_for_page(view.page - 1))
        );
    }
    if view.page < view.num_pages {
        let _ = write!(
            html,
            "<a hx-get=\"{}/{}\">Next</a>",
            view.base,
            escape(&view.query_for_page(view.page + 1))
        );
    }
    html.push_str("</nav>");
    html
}

pub fn list_table(view: &TableView<'_>) -> String {
    let mut html = String::from("<table id=\"datatable\"><thead><tr><th></th>");
    for header in view.headers {
        let _ = write!(html, "<th>{}</th>", escape(header));
    }
    html.push_str("<th></th></tr></thead>");
    html.push_str(&table_body(view.base, &view.ids, &view.rows));
    html.push_str("</table>");
    html.push_str(&pagination(view));
    html
}

pub fn card_grid(view: &TableView<'_>) -> String {
    let mut html = String::from("<div id=\"datatable\" class=\"cards\">");
    for (id, row) in view.ids.iter().zip(&view.rows) {
        let _ = write!(html, "<article class=\"card\" data-id=\"{id}\"><dl>");
        for (header, cell) in view.headers.iter().zip(row) {
            let _ = write!(html, "<dt>{}</dt><dd>{}</dd>", escape(header), escape(cell));
        }
        html.push_str("</dl></article>");
    }
    html.push_str("</div>");
    html.push_str(&pagination(view));
    html
}

pub fn dashboard_cards(counts: &DashboardCounts) -> String {
    let cards = [
        ("Bills of Materials", counts.total_bill_of_materialses),
        ("BOM Lines", counts.total_bom_lines),
        ("Production Orders", counts.total_production_orders),
        ("Production Batches", counts.total_production_batches),
    ];
    let mut html = String::from("<div class=\"dashboard-cards\">");
    for (label, total) in cards {
        let _ = write!(
            html,
            "<div class=\"card\"><h3>{label}</h3><p class=\"count\">{total}</p></div>"
        );
    }
    html.push_str("</div>");
    html
}

/// One input of a form panel; `choices` turns it into a select.
#[derive(Debug, Clone, Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub value: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<(String, String)>,
}

impl FormField {
    pub fn text(name: &'static str, label: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            label,
            value: value.into(),
            choices: Vec::new(),
        }
    }

    pub fn select(
        name: &'static str,
        label: &'static str,
        value: impl Into<String>,
        choices: Vec<(String, String)>,
    ) -> Self {
        Self {
            name,
            label,
            value: value.into(),
            choices,
        }
    }
}

/// Add/edit form payload.
#[derive(Debug, Clone, Serialize)]
pub struct FormPanel {
    pub title: String,
    pub action: String,
    pub fields: Vec<FormField>,
}

pub fn form_panel(panel: &FormPanel) -> String {
    let mut html = format!(
        "<div class=\"panel\"><h2>{}</h2><form hx-post=\"{}\">",
        escape(&panel.title),
        escape(&panel.action)
    );
    for field in &panel.fields {
        let _ = write!(html, "<label>{}", escape(field.label));
        if field.choices.is_empty() {
            let _ = write!(
                html,
                "<input name=\"{}\" value=\"{}\">",
                field.name,
                escape(&field.value)
            );
        } else {
            let _ = write!(html, "<select name=\"{}\">", field.name);
            for (value, label) in &field.choices {
                let selected = if *value == field.value { " selected" } else { "" };
                let _ = write!(
                    html,
                    "<option value=\"{}\"{selected}>{}</option>",
                    escape(value),
                    escape(label)
                );
            }
            html.push_str("</select>");
        }
        html.push_str("</label>");
    }
    html.push_str("<button type=\"submit\">Save</button></form></div>");
    html
}

pub fn order_detail(base: &str, detail: &ProductionOrderDetail) -> String {
    let order = &detail.order;
    let mut html = format!(
        "<section class=\"order-detail\" data-id=\"{}\"><h2>{}</h2><p class=\"status\">{}</p>",
        order.id,
        escape(&order.order_number),
        order.status.label()
    );
    if let Some(bom) = &detail.bom {
        let _ = write!(html, "<p class=\"bom\">{}</p>", escape(&bom.name));
    }
    let _ = write!(
        html,
        "<button hx-get=\"{base}/{}/batches/panel/\">Add batch</button>",
        order.id
    );
    for entry in &detail.batches {
        let batch = &entry.batch;
        let _ = write!(
            html,
            "<article class=\"batch\" data-id=\"{}\"><h3>{}</h3><p>{} &middot; {}</p>\
             <button hx-post=\"{base}/{}/batches/{}/delete/\">Delete batch</button><ul>",
            batch.id,
            escape(&batch.batch_number),
            batch.quantity_produced,
            batch.quality_status.label(),
            order.id,
            batch.id
        );
        for ingredient in &entry.ingredients {
            let _ = write!(
                html,
                "<li data-id=\"{}\">{} ({}) {} {}</li>",
                ingredient.id,
                escape(&ingredient.description),
                escape(&ingredient.supplier_lot),
                ingredient.quantity_used,
                escape(&ingredient.unit)
            );
        }
        html.push_str("</ul></article>");
    }
    html.push_str("</section>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape("<b>\"Tom\" & 'Jerry'</b>"),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#x27;Jerry&#x27;&lt;/b&gt;"
        );
    }

    #[test]
    fn body_renders_rows_and_empty_state() {
        let id = Uuid::new_v4();
        let html = table_body(
            "/manufacturing/bom",
            &[id],
            &[vec!["TST-001".into(), "<Test>".into()]],
        );
        assert!(html.starts_with("<tbody id=\"datatable-body\">"));
        assert!(html.contains(&format!("value=\"{id}\"")));
        assert!(html.contains("<td>&lt;Test&gt;</td>"));

        let empty = table_body("/manufacturing/bom", &[], &[]);
        assert!(empty.contains("No records"));
    }

    #[test]
    fn form_panel_marks_selected_choice() {
        let panel = FormPanel {
            title: "Add".into(),
            action: "/manufacturing/production/add/".into(),
            fields: vec![FormField::select(
                "status",
                "Status",
                "done",
                vec![("draft".into(), "Draft".into()), ("done".into(), "Done".into())],
            )],
        };
        let html = form_panel(&panel);
        assert!(html.contains("<option value=\"done\" selected>Done</option>"));
        assert!(html.contains("<option value=\"draft\">Draft</option>"));
    }
}
