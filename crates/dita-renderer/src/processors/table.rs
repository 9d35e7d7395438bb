use crate::audience::AudienceFilter;
use crate::conversion::Conversion;
use crate::error::ConvertError;
use crate::rules::TagProcessor;
use crate::token::{Element, ReplayStream, StartTag, TokenSource, eq_fold, read_element};

/// CALS table (`table` > `tgroup` > `thead`/`tbody` > `row` > `entry`).
///
/// Column widths from `colspec` become header cell styles, `namest` and
/// `nameend` become `colspan`, `morerows` becomes `rowspan`. Body rows not
/// meant for web output are dropped.
pub struct TableProcessor;

/// Simple table (`simpletable` > `sthead`/`strow` > `stentry`).
///
/// `relcolwidth` is normalized to percentages on the header cells.
pub struct SimpleTableProcessor;

impl TagProcessor for TableProcessor {
    fn name(&self) -> &str {
        "table"
    }

    fn process(
        &self,
        conv: &mut Conversion<'_>,
        stream: &mut dyn TokenSource,
        start: StartTag,
    ) -> Result<(), ConvertError> {
        let table = read_element(stream, start)?;

        let mut wrapper = table.start.clone();
        wrapper.name = "div".to_owned();
        wrapper.set_attr("class", "table");
        conv.encoder().open(&wrapper)?;

        let title = table.child("title");
        for (index, group) in table.elements_named("tgroup").enumerate() {
            render_group(conv, group, if index == 0 { title } else { None })?;
        }

        conv.encoder().close("div")
    }
}

fn render_group(
    conv: &mut Conversion<'_>,
    group: &Element,
    title: Option<&Element>,
) -> Result<(), ConvertError> {
    let audience = &conv.options().audience;
    let columns: Vec<&str> = group
        .elements_named("colspec")
        .map(|colspec| colspec.attr("colname"))
        .collect();
    let widths = relative_widths(
        &group
            .elements_named("colspec")
            .map(|colspec| colspec.attr("colwidth"))
            .collect::<Vec<_>>(),
    );

    conv.encoder().open_tag("table")?;

    if let Some(title) = title {
        render_cell(conv, StartTag::new("caption"), title)?;
    }

    if let Some(head) = group.child("thead") {
        conv.encoder().open_tag("thead")?;
        for row in head.elements_named("row") {
            conv.encoder().open(&row_tag(row))?;
            for (index, entry) in row.elements_named("entry").enumerate() {
                let mut th = cell_tag("th", entry, &columns);
                if let Some(width) = widths.get(index)
                    && !width.is_empty()
                {
                    th.set_attr("style", format!("width:{width};"));
                }
                render_cell(conv, th, entry)?;
            }
            conv.encoder().close("tr")?;
        }
        conv.encoder().close("thead")?;
    }

    if let Some(body) = group.child("tbody") {
        conv.encoder().open_tag("tbody")?;
        for row in body
            .elements_named("row")
            .filter(|row| is_visible(audience, row))
        {
            conv.encoder().open(&row_tag(row))?;
            for entry in row.elements_named("entry") {
                render_cell(conv, cell_tag("td", entry, &columns), entry)?;
            }
            conv.encoder().close("tr")?;
        }
        conv.encoder().close("tbody")?;
    }

    conv.encoder().close("table")
}

impl TagProcessor for SimpleTableProcessor {
    fn name(&self) -> &str {
        "simpletable"
    }

    fn process(
        &self,
        conv: &mut Conversion<'_>,
        stream: &mut dyn TokenSource,
        start: StartTag,
    ) -> Result<(), ConvertError> {
        let table = read_element(stream, start)?;
        let audience = &conv.options().audience;
        let widths = relative_widths(&table.attr("relcolwidth").split_whitespace().collect::<Vec<_>>());

        let mut tag = StartTag::new("table").with_attr("class", "simpletable");
        tag.set_attr("id", table.attr("id"));
        conv.encoder().open(&tag)?;

        if let Some(head) = table.child("sthead") {
            conv.encoder().open_tag("thead")?;
            conv.encoder().open(&row_tag(head))?;
            for (index, entry) in head.elements_named("stentry").enumerate() {
                let mut th = StartTag::new("th");
                if let Some(width) = widths.get(index)
                    && !width.is_empty()
                {
                    th.set_attr("style", format!("width:{width};"));
                }
                render_cell(conv, th, entry)?;
            }
            conv.encoder().close("tr")?;
            conv.encoder().close("thead")?;
        }

        conv.encoder().open_tag("tbody")?;
        for row in table
            .elements_named("strow")
            .filter(|row| is_visible(audience, row))
        {
            conv.encoder().open(&row_tag(row))?;
            for entry in row.elements_named("stentry") {
                render_cell(conv, StartTag::new("td"), entry)?;
            }
            conv.encoder().close("tr")?;
        }
        conv.encoder().close("tbody")?;

        conv.encoder().close("table")
    }
}

fn is_visible(audience: &AudienceFilter, row: &Element) -> bool {
    audience.is_web_audience(row.attr("audience"), row.attr("print"), row.attr("deliveryTarget"))
}

fn row_tag(row: &Element) -> StartTag {
    let mut tag = StartTag::new("tr");
    tag.set_attr("id", row.attr("id"));
    tag
}

/// Cell start tag with spans derived from CALS attributes.
fn cell_tag(name: &str, entry: &Element, columns: &[&str]) -> StartTag {
    let mut tag = StartTag::new(name);
    tag.set_attr("id", entry.attr("id"));

    let first = column_index(columns, entry.attr("namest"));
    let last = column_index(columns, entry.attr("nameend"));
    if let (Some(first), Some(last)) = (first, last)
        && first < last
    {
        tag.set_attr("colspan", (last - first + 1).to_string());
    }

    if let Ok(more) = entry.attr("morerows").trim().parse::<usize>()
        && more > 0
    {
        tag.set_attr("rowspan", (more + 1).to_string());
    }

    tag
}

fn column_index(columns: &[&str], name: &str) -> Option<usize> {
    if name.is_empty() {
        return None;
    }
    columns.iter().position(|column| eq_fold(column, name))
}

/// Open `tag`, render the children of `content` through the rules, close.
fn render_cell(
    conv: &mut Conversion<'_>,
    tag: StartTag,
    content: &Element,
) -> Result<(), ConvertError> {
    conv.encoder().open(&tag)?;
    let result = conv.recurse(&mut ReplayStream::new(content.content_tokens()));
    let closed = conv.encoder().close(&tag.name);
    result.and(closed)
}

/// Convert proportional widths (`1*`, `2*`) to rounded percentages.
///
/// When any value is not proportional, each value is converted on its own:
/// `N*` becomes `N%` and other values are kept.
fn relative_widths(values: &[&str]) -> Vec<String> {
    let proportional: Option<Vec<f64>> = values
        .iter()
        .map(|value| {
            value
                .strip_suffix('*')
                .and_then(|number| number.trim().parse::<f64>().ok())
        })
        .collect();

    if let Some(numbers) = proportional {
        let total: f64 = numbers.iter().sum();
        if total > 0.0 {
            return numbers
                .iter()
                .map(|number| format!("{:.0}%", number / total * 100.0))
                .collect();
        }
    }

    values
        .iter()
        .map(|value| match value.strip_suffix('*') {
            Some("") => String::new(),
            Some(number) => format!("{number}%"),
            None => (*value).to_owned(),
        })
        .collect()
}
