//! Human-readable tree dump of the sparse memory content.

use std::fmt;

use crate::MemoryImage;

const BRANCH: &str = "`--------";
const PAGE_GAP: &str = "          ";

/// Renders a [`MemoryImage`] as an address-sorted tree of sets, pages and
/// written bytes. Unallocated sets and pages and unwritten bytes are skipped.
///
/// Each page's byte list ends with a spacer line carrying the page's tree
/// prefix, and each set ends with an empty line.
#[derive(Debug, Clone, Copy)]
pub struct DumpFormatter;

impl DumpFormatter {
    /// Renders `image` without a leading indent.
    #[must_use]
    pub fn render(image: &MemoryImage) -> String {
        Self::render_with_indent(image, "")
    }

    /// Renders `image` with every line prefixed by `indent`.
    #[must_use]
    pub fn render_with_indent(image: &MemoryImage, indent: &str) -> String {
        ImageDump { image, indent }.to_string()
    }
}

/// Borrowed [`fmt::Display`] view behind [`DumpFormatter`].
#[derive(Debug, Clone, Copy)]
pub struct ImageDump<'a> {
    /// Image to render.
    pub image: &'a MemoryImage,
    /// Prefix written before every line.
    pub indent: &'a str,
}

impl fmt::Display for ImageDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = self.indent;
        let image = self.image;

        writeln!(f, "{indent}Functional Memory Dump")?;
        writeln!(f, "{indent}Executable file name: {}", image.name())?;
        writeln!(f, "{indent}First address: {:#x}", image.begin_addr())?;
        writeln!(f, "{indent}Last address: {:#x}", image.end_addr())?;
        writeln!(f, "{indent}Content:")?;
        writeln!(f, "{indent}|SET       |PAGE      |OFFSET:  VALUE     |")?;

        for (set_index, table) in image.space().sets() {
            writeln!(f, "{indent} {set_index:#x}")?;

            let mut pages = table.pages().peekable();
            while let Some((page_index, page)) = pages.next() {
                let page_marker = continuation(pages.peek().is_some());
                writeln!(f, "{indent}  {page_marker}{BRANCH}{page_index:#x}")?;

                let mut bytes = page.written_bytes().peekable();
                while let Some((offset, value)) = bytes.next() {
                    let byte_marker = continuation(bytes.peek().is_some());
                    writeln!(
                        f,
                        "{indent}  {page_marker}{PAGE_GAP}{byte_marker}{BRANCH}{offset:#x}:  {value:08b}"
                    )?;
                }
                writeln!(f, "{indent}  {page_marker}{PAGE_GAP}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

const fn continuation(more: bool) -> char {
    if more {
        '|'
    } else {
        ' '
    }
}
