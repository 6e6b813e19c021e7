//! Subgraph listing parser
//!
//! The mining tool writes the discriminative subgraphs it finds as text:
//!
//! ```text
//! S 3
//! v 1 "C"
//! v 2 "O"
//! d 1 2 "bond"
//!
//! S 1
//! v 1 "N"
//! ```
//!
//! Each `S <count>` block is one subgraph and the number of its instances;
//! `v` declares a node, `d` (or `u`) an edge with an optional label, and a
//! blank line closes the block. A stream listing concatenates one section
//! per stream item, each opened by `XP # <id>` or `XN # <id>`. Lines
//! starting with `%` are comments.

use super::{GraphError, LabeledGraph, SubgraphCount};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListingError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("line {line}: {source}")]
    Graph {
        line: usize,
        #[source]
        source: GraphError,
    },
}

/// Subgraphs reported for one stream item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedItem {
    pub id: usize,
    /// `XP` header (true) or `XN` header (false)
    pub positive: bool,
    pub subgraphs: Vec<SubgraphCount>,
}

/// Parse a single mining-tool output (no item headers)
pub fn parse_subgraph_listing(text: &str) -> Result<Vec<SubgraphCount>, ListingError> {
    let mut parser = Parser::new(false);
    for (idx, line) in text.lines().enumerate() {
        parser.feed(idx + 1, line)?;
    }
    parser.close_block()?;
    Ok(parser.loose)
}

/// Parse a stream listing made of `XP`/`XN` item sections
pub fn parse_stream_listing(text: &str) -> Result<Vec<ListedItem>, ListingError> {
    let mut parser = Parser::new(true);
    for (idx, line) in text.lines().enumerate() {
        parser.feed(idx + 1, line)?;
    }
    parser.close_item()?;
    Ok(parser.items)
}

struct Block {
    count: u64,
    nodes: Vec<(String, String)>,
    edges: Vec<(usize, String, String, String)>,
}

impl Block {
    fn build(self) -> Result<SubgraphCount, ListingError> {
        let mut graph = LabeledGraph::new();
        for (id, label) in self.nodes {
            graph.add_node(id, label);
        }
        for (line, from, to, label) in self.edges {
            graph
                .add_edge(from, to, label)
                .map_err(|source| ListingError::Graph { line, source })?;
        }
        Ok(SubgraphCount::new(graph, self.count))
    }
}

struct Parser {
    with_headers: bool,
    items: Vec<ListedItem>,
    item: Option<ListedItem>,
    loose: Vec<SubgraphCount>,
    block: Option<Block>,
}

impl Parser {
    fn new(with_headers: bool) -> Self {
        Self {
            with_headers,
            items: Vec::new(),
            item: None,
            loose: Vec::new(),
            block: None,
        }
    }

    fn feed(&mut self, line_no: usize, raw: &str) -> Result<(), ListingError> {
        let line = raw.trim();
        if line.is_empty() {
            return self.close_block();
        }
        if line.starts_with('%') {
            return Ok(());
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let syntax = |message: String| ListingError::Syntax {
            line: line_no,
            message,
        };

        match tokens[0] {
            tag @ ("XP" | "XN") => {
                if !self.with_headers {
                    return Err(syntax(format!("unexpected item header {tag}")));
                }
                self.close_item()?;
                let id = match tokens.as_slice() {
                    [_, "#", id, ..] => id
                        .parse::<usize>()
                        .map_err(|_| syntax(format!("invalid item id {id:?}")))?,
                    _ => return Err(syntax(format!("expected \"{tag} # <id>\""))),
                };
                self.item = Some(ListedItem {
                    id,
                    positive: tag == "XP",
                    subgraphs: Vec::new(),
                });
            }
            "S" => {
                self.close_block()?;
                if self.with_headers && self.item.is_none() {
                    return Err(syntax("subgraph block before any item header".into()));
                }
                let count = tokens
                    .get(1)
                    .ok_or_else(|| syntax("missing instance count".into()))?
                    .parse::<u64>()
                    .map_err(|_| syntax(format!("invalid instance count {:?}", tokens[1])))?;
                self.block = Some(Block {
                    count,
                    nodes: Vec::new(),
                    edges: Vec::new(),
                });
            }
            "v" => {
                let block = self
                    .block
                    .as_mut()
                    .ok_or_else(|| syntax("node outside of a subgraph block".into()))?;
                let id = tokens
                    .get(1)
                    .ok_or_else(|| syntax("node without id".into()))?;
                block.nodes.push((id.to_string(), label(&tokens[2..])));
            }
            "d" | "u" => {
                let block = self
                    .block
                    .as_mut()
                    .ok_or_else(|| syntax("edge outside of a subgraph block".into()))?;
                match tokens.as_slice() {
                    [_, from, to, rest @ ..] => {
                        block
                            .edges
                            .push((line_no, from.to_string(), to.to_string(), label(rest)))
                    }
                    _ => return Err(syntax("edge needs two endpoints".into())),
                }
            }
            other => return Err(syntax(format!("unknown directive {other:?}"))),
        }
        Ok(())
    }

    fn close_block(&mut self) -> Result<(), ListingError> {
        if let Some(block) = self.block.take() {
            let subgraph = block.build()?;
            match self.item.as_mut() {
                Some(item) => item.subgraphs.push(subgraph),
                None => self.loose.push(subgraph),
            }
        }
        Ok(())
    }

    fn close_item(&mut self) -> Result<(), ListingError> {
        self.close_block()?;
        if let Some(item) = self.item.take() {
            self.items.push(item);
        }
        Ok(())
    }
}

fn label(tokens: &[&str]) -> String {
    tokens.join(" ").trim_matches('"').to_string()
}
