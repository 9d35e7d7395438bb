use dita_storage::path;

use crate::conversion::Conversion;
use crate::diagnostics::DiagnosticKind;
use crate::error::ConvertError;
use crate::rules::TagProcessor;
use crate::token::{Element, StartTag, TokenSource, read_element};

/// Clickable image regions.
///
/// Renders the `image` child with a `usemap` reference and turns every
/// `area` into an HTML `<area>` whose `href` points at the output page of
/// its `xref`. Areas with an unknown shape or malformed coordinates are
/// reported and dropped.
pub struct ImageMapProcessor;

impl TagProcessor for ImageMapProcessor {
    fn name(&self) -> &str {
        "imagemap"
    }

    fn process(
        &self,
        conv: &mut Conversion<'_>,
        stream: &mut dyn TokenSource,
        start: StartTag,
    ) -> Result<(), ConvertError> {
        let element = read_element(stream, start)?;
        let Some(image) = element.child("image") else {
            conv.report(DiagnosticKind::Validation, "imagemap without image");
            return Ok(());
        };

        let href = image.attr("href");
        let name = map_name(element.attr("id"), href);

        let mut img = StartTag::new("img").with_attr("src", conv.resolve_media(href));
        let alt = match image.child("alt") {
            Some(alt) => alt.text().trim().to_owned(),
            None => image.attr("alt").to_owned(),
        };
        img.set_attr("alt", alt);
        img.set_attr("usemap", format!("#{name}"));

        let areas: Vec<StartTag> = element
            .elements_named("area")
            .filter_map(|area| render_area(conv, area))
            .collect();

        conv.encoder()
            .open(&StartTag::new("div").with_attr("class", "imagemap"))?;
        conv.encoder().open(&img)?;
        conv.encoder().close("img")?;
        conv.encoder()
            .open(&StartTag::new("map").with_attr("name", name))?;
        for area in &areas {
            conv.encoder().open(area)?;
            conv.encoder().close("area")?;
        }
        conv.encoder().close("map")?;
        conv.encoder().close("div")
    }
}

/// `name` of the generated `<map>`: the element id, else the image file stem.
fn map_name(id: &str, href: &str) -> String {
    if !id.is_empty() {
        return id.to_owned();
    }
    let stem = path::trim_ext(path::base(href));
    let stem: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("imagemap-{stem}")
}

fn render_area(conv: &mut Conversion<'_>, area: &Element) -> Option<StartTag> {
    let shape = area
        .child("shape")
        .map(|shape| shape.text().trim().to_ascii_lowercase())
        .filter(|shape| !shape.is_empty())
        .unwrap_or_else(|| "rect".to_owned());
    let coords = area
        .child("coords")
        .map(|coords| coords.text())
        .unwrap_or_default();

    let coords = match parse_coords(&shape, &coords) {
        Ok(coords) => coords,
        Err(message) => {
            conv.report(DiagnosticKind::Validation, message);
            return None;
        }
    };

    let mut tag = StartTag::new("area")
        .with_attr("shape", shape)
        .with_attr("coords", coords);

    let Some(xref) = area.child("xref") else {
        return Some(tag);
    };
    let href = xref.attr("href");
    let mut alt = xref.text().trim().to_owned();
    let resolved = if href.is_empty() {
        None
    } else {
        conv.resolve_link(href)
    };
    match resolved {
        Some(link) => {
            tag.set_attr("href", link.href);
            tag.set_attr("title", link.synopsis);
            if alt.is_empty() {
                alt = link.title;
            }
        }
        None => tag.set_attr("href", href),
    }
    tag.set_attr("alt", alt);
    if xref.attr("scope") == "external" {
        tag.set_attr("target", "_blank");
    }
    Some(tag)
}

/// Normalized coordinate list for `shape`, or a message describing why the
/// area is invalid.
fn parse_coords(shape: &str, coords: &str) -> Result<String, String> {
    let values: Result<Vec<i64>, _> = coords
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::parse)
        .collect();
    let Ok(values) = values else {
        return Err(format!("invalid imagemap coords \"{coords}\""));
    };

    let valid = match shape {
        "rect" => values.len() == 4,
        "circle" => values.len() == 3,
        "poly" => values.len() >= 6 && values.len() % 2 == 0,
        "default" => values.is_empty(),
        _ => return Err(format!("unhandled imagemap shape \"{shape}\"")),
    };
    if !valid {
        return Err(format!("invalid imagemap coords \"{coords}\" for {shape}"));
    }

    Ok(values
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(","))
}
