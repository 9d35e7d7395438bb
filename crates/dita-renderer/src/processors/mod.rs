//! Built-in tag processors.
//!
//! | Processor | Handles |
//! |-----------|---------|
//! | `link` | `a` (renamed `xref`/`link`): href rewriting, titles, downloads |
//! | `image` | `img` (renamed `image`): src rewriting, alt text, break placement |
//! | `note` | `note`: icon header and typed container |
//! | `step` | `step`, `substep`: list item with optional marker |
//! | `menucascade` | `menucascade`: separated menu path |
//! | `table` | CALS `table` |
//! | `simpletable` | `simpletable` |
//! | `imagemap` | `imagemap`: image with clickable `area` regions |
//! | `data` | `data`: tutorial video embed |

mod data;
mod image;
mod imagemap;
mod link;
mod menucascade;
mod note;
mod step;
mod table;

pub use data::DataProcessor;
pub use image::ImageProcessor;
pub use imagemap::ImageMapProcessor;
pub use link::LinkProcessor;
pub use menucascade::MenuCascadeProcessor;
pub use note::NoteProcessor;
pub use step::StepProcessor;
pub use table::{SimpleTableProcessor, TableProcessor};

use crate::rules::ProcessorRegistry;

/// Registry with all built-in processors.
#[must_use]
pub fn builtin_registry() -> ProcessorRegistry {
    ProcessorRegistry::new()
        .with(LinkProcessor)
        .with(ImageProcessor)
        .with(NoteProcessor)
        .with(StepProcessor)
        .with(MenuCascadeProcessor)
        .with(TableProcessor)
        .with(SimpleTableProcessor)
        .with(ImageMapProcessor)
        .with(DataProcessor)
}
