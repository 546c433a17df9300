use crate::graph::{EdgeKind, Graph};
use core::fmt;

/// How edges and nodes are decorated in DOT output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DotStyle {
    /// Edges coloured by kind.
    #[default]
    Colored,
    /// Black edges and hidden node labels, for showing bare structure.
    Plain,
}

/// DOT (Graphviz) rendering of a `Graph`, produced by `Graph::dot`.
///
/// Formatting never fails, including for the empty graph.
#[derive(Debug, Clone, Copy)]
pub struct Dot<'a> {
    graph: &'a Graph,
    style: DotStyle,
}

impl Graph {
    /// Render the graph as a DOT digraph.
    pub fn dot(&self, style: DotStyle) -> Dot<'_> {
        Dot { graph: self, style }
    }
}

fn color(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::Sequential => "black",
        EdgeKind::Fork => "green",
        EdgeKind::Join => "blue",
        EdgeKind::Compute => "red",
        EdgeKind::Return => "orange",
    }
}

impl fmt::Display for Dot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { graph, style } = *self;
        writeln!(f, "digraph G {{")?;
        if style == DotStyle::Plain {
            writeln!(f, "  node[fontcolor=\"white\"];")?;
        }
        for segment in graph.segments() {
            writeln!(f, "  \"{segment}\";")?;
        }
        writeln!(f)?;
        for edge in graph.edges() {
            let color = match style {
                DotStyle::Colored => color(edge.kind),
                DotStyle::Plain => "black",
            };
            writeln!(
                f,
                "  \"{}\" -> \"{}\" [color={color}];",
                graph.segments[edge.from.index()],
                graph.segments[edge.to.index()],
            )?;
        }
        write!(f, "}}")
    }
}
