use crate::Result;
use crate::tpl::ast::{Document, Node, NodeKind};
use crate::tpl::render_context::{Bindings, Context, FieldValue};

/// Output fragments in the order they were produced.
#[derive(Debug, Default)]
pub struct RenderBuffer {
    pub fragments: Vec<String>,
}

impl RenderBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: impl Into<String>) {
        self.fragments.push(fragment.into());
    }

    pub fn into_fragments(self) -> Vec<String> {
        self.fragments
    }
}

/// Concatenates fragments in order, without separators or trimming.
pub fn assemble(fragments: &[String]) -> String {
    fragments.concat()
}

/// Renders a document into its fragment sequence. The `<poml>` root itself
/// produces nothing; rendering starts at its children.
pub fn render_fragments<B: Bindings + ?Sized>(
    doc: &Document,
    bindings: &B,
) -> Result<Vec<String>> {
    let ctx = Context::new(bindings);
    let mut buf = RenderBuffer::new();
    render(doc.children(), &ctx, &mut buf)?;
    Ok(buf.into_fragments())
}

fn render_heading(level: usize, node: &Node, buf: &mut RenderBuffer) {
    buf.push(format!("{} {}\n\n", "#".repeat(level), node.text_or_empty()));
}

/// Numbers the direct `<item>` children; any other child is skipped here.
fn render_list(node: &Node, buf: &mut RenderBuffer) {
    let items = node
        .children()
        .iter()
        .filter(|child| child.kind() == NodeKind::Item);
    for (i, item) in items.enumerate() {
        buf.push(format!("{}. {}\n", i + 1, item.text_or_empty()));
    }
    buf.push("\n");
}

fn render_code(node: &Node, buf: &mut RenderBuffer) {
    let lang = node.attr("type").unwrap_or("");
    let body = node.text_or_empty().trim();
    buf.push(format!("```{}\n{}\n```\n\n", lang, body));
}

fn render_field<B: Bindings + ?Sized>(
    node: &Node,
    ctx: &Context<B>,
    buf: &mut RenderBuffer,
) -> Result<()> {
    let name = ctx.field_name(node)?;
    match ctx.resolve(node)? {
        FieldValue::Text(value) => buf.push(format!("- **{}**: [{}]\n", name, value)),
        FieldValue::List(items) => {
            buf.push(format!("- **{}**:\n", name));
            for item in items {
                buf.push(format!("  - [{}]\n", item));
            }
        }
    }
    Ok(())
}

/// Walks `nodes` in pre-order: each node's own output, then its subtree, then
/// its next sibling. The walk keeps its own stack of pending nodes, so nesting
/// depth does not grow the call stack.
pub(crate) fn render<B: Bindings + ?Sized>(
    nodes: &[Node],
    ctx: &Context<B>,
    buf: &mut RenderBuffer,
) -> Result<()> {
    // Next node to visit on top.
    let mut pending: Vec<&Node> = nodes.iter().rev().collect();
    while let Some(node) = pending.pop() {
        match node.kind() {
            NodeKind::H1 => render_heading(1, node, buf),
            NodeKind::H2 => render_heading(2, node, buf),
            NodeKind::H3 => render_heading(3, node, buf),
            NodeKind::Paragraph => buf.push(format!("{}\n\n", node.text_or_empty())),
            NodeKind::List => render_list(node, buf),
            NodeKind::Code => render_code(node, buf),
            NodeKind::Field => render_field(node, ctx, buf)?,
            // Items are numbered by their list; unknown tags are pass-through.
            NodeKind::Item | NodeKind::Unknown => {}
        }

        pending.extend(node.children().iter().rev());
    }
    Ok(())
}
