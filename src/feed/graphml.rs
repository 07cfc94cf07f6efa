//! yEd GraphML workflow diagrams.
//!
//! States are graph nodes and transitions are edges. Their properties live in
//! `<data>` elements whose meaning is declared by `<key for=".." attr.name="..">`
//! elements; labels come from the yEd `NodeLabel`/`EdgeLabel` graphics.

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use strum::{Display, EnumIter, IntoEnumIterator};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphmlError {
    #[error("malformed GraphML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed GraphML attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("cannot read GraphML: {0}")]
    Io(#[from] io::Error),

    #[error("no <key for=\"{domain}\" attr.name=\"{name}\"> declared")]
    MissingKey {
        domain: &'static str,
        name: &'static str,
    },

    #[error("{element} {id:?} has no {property}")]
    MissingValue {
        element: &'static str,
        id: String,
        property: &'static str,
    },

    #[error("edge {edge:?} references unknown node {node:?}")]
    UnknownNode { edge: String, node: String },

    #[error("edge {edge:?} has an invalid ask list")]
    InvalidAsk {
        edge: String,
        source: serde_json::Error,
    },

    #[error("first state {0:?} is not a declared state")]
    UnknownFirstState(String),
}

/// Transition step at which a workflow hook method runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    M0,
    M1,
    M2,
    M3,
}

impl Stage {
    /// `m0`/`m1` run before the state change, `m2`/`m3` after it.
    pub fn runs_before_change(self) -> bool {
        matches!(self, Stage::M0 | Stage::M1)
    }

    fn key_name(self) -> &'static str {
        match self {
            Stage::M0 => "m0",
            Stage::M1 => "m1",
            Stage::M2 => "m2",
            Stage::M3 => "m3",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct State {
    pub id: String,
    pub name: String,
    pub activity: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Name of the source state.
    pub from: String,
    /// Name of the target state.
    pub to: String,
    pub methods: Vec<(Stage, String)>,
    pub ask: Option<Vec<String>>,
    pub nr: bool,
}

impl Transition {
    pub fn method(&self, stage: Stage) -> Option<&str> {
        self.methods
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, name)| name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowGraph {
    pub first_state: String,
    /// Sorted by name.
    pub states: Vec<State>,
    /// Sorted by name.
    pub transitions: Vec<Transition>,
}

impl WorkflowGraph {
    pub fn read(path: &Path, prefix: &str) -> Result<Self, GraphmlError> {
        let reader = BufReader::new(File::open(path)?);
        Self::parse(reader, prefix)
    }

    pub fn parse_str(xml: &str, prefix: &str) -> Result<Self, GraphmlError> {
        Self::parse(xml.as_bytes(), prefix)
    }

    /// Decode a diagram. A non-empty `prefix` renames every state and
    /// transition id to `<prefix>_<id>`.
    pub fn parse<R: BufRead>(reader: R, prefix: &str) -> Result<Self, GraphmlError> {
        let raw = RawGraph::scan(reader)?;
        raw.resolve(prefix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner {
    Graph,
    Node(usize),
    Edge(usize),
}

#[derive(Debug, Default)]
struct RawElement {
    id: String,
    source: String,
    target: String,
    data: Vec<(String, String)>,
    label: Option<String>,
}

impl RawElement {
    fn value(&self, key: Option<&str>) -> Option<&str> {
        let key = key?;
        self.data
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Direct text of one open element, up to its first child element.
struct Capture {
    owner: Owner,
    depth: usize,
    key: String,
    text: String,
    sealed: bool,
}

#[derive(Default)]
struct RawGraph {
    /// (domain, attr.name) -> key id
    keys: HashMap<(String, String), String>,
    graph_data: Vec<(String, String)>,
    nodes: Vec<RawElement>,
    edges: Vec<RawElement>,
}

impl RawGraph {
    fn scan<R: BufRead>(reader: R) -> Result<Self, GraphmlError> {
        let mut reader = Reader::from_reader(reader);
        let mut graph = RawGraph::default();
        let mut owners = vec![Owner::Graph];
        let mut depth = 0usize;
        let mut data: Option<Capture> = None;
        let mut label: Option<Capture> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    seal(&mut data);
                    seal(&mut label);
                    depth += 1;
                    match e.local_name().as_ref() {
                        b"key" => graph.declare_key(&e)?,
                        b"node" => {
                            graph.nodes.push(element_from(&e)?);
                            owners.push(Owner::Node(graph.nodes.len() - 1));
                        }
                        b"edge" => {
                            graph.edges.push(element_from(&e)?);
                            owners.push(Owner::Edge(graph.edges.len() - 1));
                        }
                        b"data" => {
                            data = Some(Capture {
                                owner: current(&owners),
                                depth,
                                key: attribute(&e, b"key")?.unwrap_or_default(),
                                text: String::new(),
                                sealed: false,
                            });
                        }
                        b"NodeLabel" | b"EdgeLabel" if label.is_none() => {
                            label = Some(Capture {
                                owner: current(&owners),
                                depth,
                                key: String::new(),
                                text: String::new(),
                                sealed: false,
                            });
                        }
                        _ => {}
                    }
                }
                Event::Empty(e) => {
                    seal(&mut data);
                    seal(&mut label);
                    match e.local_name().as_ref() {
                        b"key" => graph.declare_key(&e)?,
                        b"node" => graph.nodes.push(element_from(&e)?),
                        b"edge" => graph.edges.push(element_from(&e)?),
                        _ => {}
                    }
                }
                Event::Text(e) => {
                    let text = e.unescape()?;
                    append_text(&mut data, depth, &text);
                    append_text(&mut label, depth, &text);
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e);
                    append_text(&mut data, depth, &text);
                    append_text(&mut label, depth, &text);
                }
                Event::End(e) => {
                    match e.local_name().as_ref() {
                        b"node" | b"edge" => {
                            owners.pop();
                        }
                        b"data" => {
                            if let Some(capture) = data.take() {
                                graph.store_data(capture);
                            }
                        }
                        b"NodeLabel" | b"EdgeLabel" => {
                            if let Some(capture) = label.take() {
                                graph.store_label(capture);
                            }
                        }
                        _ => {}
                    }
                    depth = depth.saturating_sub(1);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(graph)
    }

    fn declare_key(&mut self, e: &BytesStart<'_>) -> Result<(), GraphmlError> {
        let id = attribute(e, b"id")?;
        let domain = attribute(e, b"for")?;
        let name = attribute(e, b"attr.name")?;
        if let (Some(id), Some(domain), Some(name)) = (id, domain, name) {
            self.keys.insert((domain, name), id);
        }
        Ok(())
    }

    fn element_mut(&mut self, owner: Owner) -> Option<&mut RawElement> {
        match owner {
            Owner::Graph => None,
            Owner::Node(index) => self.nodes.get_mut(index),
            Owner::Edge(index) => self.edges.get_mut(index),
        }
    }

    fn store_data(&mut self, capture: Capture) {
        let value = capture.text.trim().to_owned();
        if value.is_empty() {
            return;
        }
        let entry = (capture.key, value);
        match self.element_mut(capture.owner) {
            Some(element) => element.data.push(entry),
            None => self.graph_data.push(entry),
        }
    }

    fn store_label(&mut self, capture: Capture) {
        let text = capture
            .text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if let Some(element) = self.element_mut(capture.owner) {
            if element.label.is_none() {
                element.label = Some(text);
            }
        }
    }

    fn key(&self, domain: &'static str, name: &'static str) -> Option<&str> {
        self.keys
            .get(&(domain.to_owned(), name.to_owned()))
            .map(String::as_str)
    }

    fn required_key(&self, domain: &'static str, name: &'static str) -> Result<&str, GraphmlError> {
        self.key(domain, name)
            .ok_or(GraphmlError::MissingKey { domain, name })
    }

    fn resolve(self, prefix: &str) -> Result<WorkflowGraph, GraphmlError> {
        let prefixed = |id: &str| {
            if prefix.is_empty() {
                id.to_owned()
            } else {
                format!("{prefix}_{id}")
            }
        };

        let node_id = self.required_key("node", "id")?;
        let node_name = self.required_key("node", "name")?;
        let node_activity = self.key("node", "activity");

        let mut names_by_node = HashMap::new();
        let mut states = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let name = required_value(node, "state", node_name, "name")?;
            let id = required_value(node, "state", node_id, "id")?;
            names_by_node.insert(node.id.as_str(), name.to_owned());
            states.push(State {
                id: prefixed(id),
                name: name.to_owned(),
                activity: node.value(node_activity).map(str::to_owned),
                description: node.label.clone().unwrap_or_default(),
            });
        }

        let edge_id = self.required_key("edge", "id")?;
        let edge_name = self.required_key("edge", "name")?;
        let edge_ask = self.key("edge", "ask");
        let edge_nr = self.key("edge", "nr");

        let mut transitions = Vec::with_capacity(self.edges.len());
        for edge in &self.edges {
            let name = required_value(edge, "transition", edge_name, "name")?;
            let id = required_value(edge, "transition", edge_id, "id")?;
            let endpoint = |node: &str| {
                names_by_node
                    .get(node)
                    .cloned()
                    .ok_or_else(|| GraphmlError::UnknownNode {
                        edge: edge.id.clone(),
                        node: node.to_owned(),
                    })
            };
            let methods = Stage::iter()
                .filter_map(|stage| {
                    edge.value(self.key("edge", stage.key_name()))
                        .map(|method| (stage, method.to_owned()))
                })
                .collect();
            let ask = edge
                .value(edge_ask)
                .map(|raw| serde_json::from_str::<Vec<String>>(raw))
                .transpose()
                .map_err(|source| GraphmlError::InvalidAsk {
                    edge: edge.id.clone(),
                    source,
                })?;
            let nr = edge
                .value(edge_nr)
                .map(|flag| flag.eq_ignore_ascii_case("true"))
                .unwrap_or(true);

            transitions.push(Transition {
                id: prefixed(id),
                name: name.to_owned(),
                description: edge.label.clone().unwrap_or_default(),
                from: endpoint(&edge.source)?,
                to: endpoint(&edge.target)?,
                methods,
                ask,
                nr,
            });
        }

        let first_state_key = self.required_key("graph", "firstState")?;
        let first_state = self
            .graph_data
            .iter()
            .chain(self.nodes.iter().flat_map(|node| node.data.iter()))
            .find(|(key, _)| key == first_state_key)
            .map(|(_, value)| value.clone())
            .ok_or(GraphmlError::MissingValue {
                element: "graph",
                id: String::new(),
                property: "firstState",
            })?;
        if !states.iter().any(|state| state.name == first_state) {
            return Err(GraphmlError::UnknownFirstState(first_state));
        }

        states.sort_by(|a, b| a.name.cmp(&b.name));
        transitions.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(WorkflowGraph {
            first_state,
            states,
            transitions,
        })
    }
}

fn current(owners: &[Owner]) -> Owner {
    owners.last().copied().unwrap_or(Owner::Graph)
}

fn append_text(capture: &mut Option<Capture>, depth: usize, text: &str) {
    if let Some(capture) = capture {
        if capture.depth == depth && !capture.sealed {
            capture.text.push_str(text);
        }
    }
}

fn seal(capture: &mut Option<Capture>) {
    if let Some(capture) = capture {
        capture.sealed = true;
    }
}

fn attribute(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, GraphmlError> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn element_from(e: &BytesStart<'_>) -> Result<RawElement, GraphmlError> {
    Ok(RawElement {
        id: attribute(e, b"id")?.unwrap_or_default(),
        source: attribute(e, b"source")?.unwrap_or_default(),
        target: attribute(e, b"target")?.unwrap_or_default(),
        ..RawElement::default()
    })
}

fn required_value<'a>(
    element: &'a RawElement,
    kind: &'static str,
    key: &str,
    property: &'static str,
) -> Result<&'a str, GraphmlError> {
    element
        .value(Some(key))
        .ok_or_else(|| GraphmlError::MissingValue {
            element: kind,
            id: element.id.clone(),
            property,
        })
}
