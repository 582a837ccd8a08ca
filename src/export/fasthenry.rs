use std::fmt::Display;
use std::io::{self, Write};
use std::path::Path;

use slotmap::{new_key_type, SlotMap};
use tracing::{debug, info, warn};

use crate::config::{SolverSettings, Units};
use crate::domain::DEFAULT_SIGMA;
use crate::error::{ExportError, Result};
use crate::math::{Point3, Vector3};

use super::{create_output, token};

/// Default name of a FastHenry input file.
pub const DEFAULT_FILENAME: &str = "fasthenry_input_file.inp";

/// Width directions shorter than this are treated as unset.
const WIDTH_DIR_TOLERANCE: f64 = 1e-12;

new_key_type! {
    /// Handle to a node of a [`FastHenryDeck`].
    pub struct NodeId;
}

/// Filament parameters applied to segments that do not override them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilamentDefaults {
    /// Conductivity in `1 / (unit * ohm)`.
    pub sigma: f64,
    pub nhinc: u32,
    pub nwinc: u32,
    pub rh: f64,
    pub rw: f64,
}

impl FilamentDefaults {
    /// Copper conductivity expressed in `units`, one filament per segment.
    #[must_use]
    pub fn for_units(units: Units) -> Self {
        Self {
            sigma: DEFAULT_SIGMA * units.scale(),
            nhinc: 1,
            nwinc: 1,
            rh: 2.0,
            rw: 2.0,
        }
    }
}

/// A named point of the filament network.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub position: Point3,
}

/// A straight conductor bar between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub name: String,
    pub start: NodeId,
    pub end: NodeId,
    pub width: f64,
    pub height: f64,
    pub sigma: Option<f64>,
    /// Direction of the cross-section width.
    pub width_dir: Option<Vector3>,
    pub nhinc: Option<u32>,
    pub nwinc: Option<u32>,
    pub rh: Option<f64>,
    pub rw: Option<f64>,
}

impl Segment {
    #[must_use]
    pub fn new(name: impl Into<String>, start: NodeId, end: NodeId, width: f64, height: f64) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            width,
            height,
            sigma: None,
            width_dir: None,
            nhinc: None,
            nwinc: None,
            rh: None,
            rw: None,
        }
    }

    #[must_use]
    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = Some(sigma);
        self
    }

    #[must_use]
    pub fn with_width_dir(mut self, dir: Vector3) -> Self {
        self.width_dir = Some(dir);
        self
    }

    /// Filament counts along height and width.
    #[must_use]
    pub fn with_filaments(mut self, nhinc: u32, nwinc: u32) -> Self {
        self.nhinc = Some(nhinc);
        self.nwinc = Some(nwinc);
        self
    }

    /// Ratios between adjacent filament sizes along height and width.
    #[must_use]
    pub fn with_ratios(mut self, rh: f64, rw: f64) -> Self {
        self.rh = Some(rh);
        self.rw = Some(rw);
        self
    }
}

/// Two nodes shorted together (`.equiv`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Equiv {
    pub a: NodeId,
    pub b: NodeId,
}

/// A port between two nodes (`.external`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct External {
    pub start: NodeId,
    pub end: NodeId,
}

/// Frequency sweep of the `.freq` line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencySweep {
    pub fmin: f64,
    pub fmax: f64,
    pub ndec: f64,
}

impl Default for FrequencySweep {
    fn default() -> Self {
        Self {
            fmin: 1.0,
            fmax: 1e9,
            ndec: 1.0,
        }
    }
}

/// Counts of what a FastHenry deck contains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FastHenrySummary {
    pub nodes: usize,
    pub segments: usize,
    pub equivs: usize,
    pub ports: usize,
}

/// A FastHenry input deck: nodes, segments, shorts and ports.
///
/// Nodes are written as `N<name>` and segments as `E<name>`. Records are
/// validated as they are added, so a deck can always be written.
#[derive(Debug, Clone)]
pub struct FastHenryDeck {
    pub units: Units,
    pub defaults: FilamentDefaults,
    pub frequency: FrequencySweep,
    nodes: SlotMap<NodeId, Node>,
    segments: Vec<Segment>,
    equivs: Vec<Equiv>,
    ports: Vec<External>,
}

impl FastHenryDeck {
    /// Empty deck in `units`, with defaults scaled to them.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidDeck`] for units FastHenry does not
    /// accept.
    pub fn new(units: Units) -> Result<Self> {
        if units == Units::Nm {
            return Err(ExportError::InvalidDeck(format!("FastHenry has no '{units}' unit")).into());
        }
        Ok(Self {
            units,
            defaults: FilamentDefaults::for_units(units),
            frequency: FrequencySweep::default(),
            nodes: SlotMap::with_key(),
            segments: Vec::new(),
            equivs: Vec::new(),
            ports: Vec::new(),
        })
    }

    /// Deck using the units and frequency range of `settings`.
    ///
    /// # Errors
    ///
    /// See [`FastHenryDeck::new`].
    pub fn from_settings(settings: &SolverSettings) -> Result<Self> {
        let mut deck = Self::new(settings.units)?;
        deck.frequency = FrequencySweep {
            fmin: settings.fmin,
            fmax: settings.fmax,
            ndec: settings.ndec,
        };
        Ok(deck)
    }

    /// Adds a node. Whitespace in `name` becomes `_`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidDeck`] if the name is empty, already
    /// used, or the position is not finite.
    pub fn add_node(&mut self, name: &str, position: Point3) -> Result<NodeId> {
        let name = token(name);
        if name.is_empty() {
            return Err(invalid("node name is empty"));
        }
        if self.node_by_name(&name).is_some() {
            return Err(invalid(format!("duplicate node '{name}'")));
        }
        if !position.iter().all(|c| c.is_finite()) {
            return Err(invalid(format!("node '{name}' has a non-finite position")));
        }
        Ok(self.nodes.insert(Node { name, position }))
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Node with the given name.
    #[must_use]
    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().find(|(_, n)| n.name == name).map(|(id, _)| id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    /// Adds a segment. Whitespace in its name becomes `_`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidDeck`] if a node is unknown, both ends
    /// are the same node, the cross-section is not positive, or the name is
    /// empty or already used.
    pub fn add_segment(&mut self, mut segment: Segment) -> Result<()> {
        segment.name = token(&segment.name);
        if segment.name.is_empty() {
            return Err(invalid("segment name is empty"));
        }
        if self.segments.iter().any(|s| s.name == segment.name) {
            return Err(invalid(format!("duplicate segment '{}'", segment.name)));
        }
        self.check_nodes(&[segment.start, segment.end])?;
        if segment.start == segment.end {
            return Err(invalid(format!("segment '{}' starts and ends on one node", segment.name)));
        }
        for (what, value) in [("width", segment.width), ("height", segment.height)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(format!("segment '{}' {what} must be positive, got {value}", segment.name)));
            }
        }
        if segment.width_dir.is_some_and(|d| d.norm() < WIDTH_DIR_TOLERANCE) {
            segment.width_dir = None;
        }
        self.segments.push(segment);
        Ok(())
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Shorts two nodes together.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidDeck`] if a node is unknown.
    pub fn add_equiv(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        self.check_nodes(&[a, b])?;
        self.equivs.push(Equiv { a, b });
        Ok(())
    }

    #[must_use]
    pub fn equivs(&self) -> &[Equiv] {
        &self.equivs
    }

    /// Declares a port between two nodes.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidDeck`] if a node is unknown or both
    /// terminals are the same node.
    pub fn add_port(&mut self, start: NodeId, end: NodeId) -> Result<()> {
        self.check_nodes(&[start, end])?;
        if start == end {
            return Err(invalid("port terminals are the same node"));
        }
        self.ports.push(External { start, end });
        Ok(())
    }

    #[must_use]
    pub fn ports(&self) -> &[External] {
        &self.ports
    }

    /// Writes the deck to `out`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error.
    pub fn write<W: Write>(&self, out: &mut W) -> Result<FastHenrySummary> {
        if self.ports.is_empty() {
            warn!("FastHenry deck has no ports");
        }
        self.write_deck(out).map_err(ExportError::from)?;
        let summary = FastHenrySummary {
            nodes: self.nodes.len(),
            segments: self.segments.len(),
            equivs: self.equivs.len(),
            ports: self.ports.len(),
        };
        info!(
            nodes = summary.nodes,
            segments = summary.segments,
            ports = summary.ports,
            "FastHenry deck written"
        );
        Ok(summary)
    }

    /// Writes the deck to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists and `overwrite` is false, or on
    /// I/O failure.
    pub fn write_to_path(&self, path: &Path, overwrite: bool) -> Result<FastHenrySummary> {
        let mut out = create_output(path, overwrite)?;
        let summary = self.write(&mut out)?;
        out.flush().map_err(ExportError::from)?;
        Ok(summary)
    }

    fn write_deck<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let defaults = &self.defaults;
        writeln!(out, "* FastHenry input file created by emvox")?;
        writeln!(out)?;
        writeln!(out, ".units {}", self.units)?;
        writeln!(out)?;
        writeln!(
            out,
            ".default sigma={} nhinc={} nwinc={} rh={} rw={}",
            defaults.sigma, defaults.nhinc, defaults.nwinc, defaults.rh, defaults.rw
        )?;
        writeln!(out)?;

        writeln!(out, "* Nodes")?;
        for node in self.nodes.values() {
            let pos = &node.position;
            writeln!(out, "N{} x={} y={} z={}", node.name, pos.x, pos.y, pos.z)?;
        }
        writeln!(out)?;

        if !self.segments.is_empty() {
            writeln!(out, "* Segments")?;
            for segment in &self.segments {
                write!(
                    out,
                    "E{} N{} N{} w={} h={}",
                    segment.name,
                    self.name_of(segment.start),
                    self.name_of(segment.end),
                    segment.width,
                    segment.height
                )?;
                write_opt(out, "sigma", segment.sigma)?;
                if let Some(dir) = segment.width_dir {
                    write!(out, " wx={} wy={} wz={}", dir.x, dir.y, dir.z)?;
                }
                write_opt(out, "nhinc", segment.nhinc)?;
                write_opt(out, "nwinc", segment.nwinc)?;
                write_opt(out, "rh", segment.rh)?;
                write_opt(out, "rw", segment.rw)?;
                writeln!(out)?;
            }
            writeln!(out)?;
        }

        if !self.equivs.is_empty() {
            writeln!(out, "* Node shorts")?;
            for equiv in &self.equivs {
                writeln!(out, ".equiv N{} N{}", self.name_of(equiv.a), self.name_of(equiv.b))?;
            }
            writeln!(out)?;
        }

        writeln!(out, "* Ports")?;
        for port in &self.ports {
            writeln!(out, ".external N{} N{}", self.name_of(port.start), self.name_of(port.end))?;
        }
        writeln!(out)?;

        let sweep = &self.frequency;
        writeln!(out, ".freq fmin={} fmax={} ndec={}", sweep.fmin, sweep.fmax, sweep.ndec)?;
        writeln!(out)?;
        writeln!(out, ".end")
    }

    fn name_of(&self, id: NodeId) -> &str {
        self.nodes.get(id).map_or("", |n| n.name.as_str())
    }

    fn check_nodes(&self, ids: &[NodeId]) -> Result<()> {
        match ids.iter().find(|id| !self.nodes.contains_key(**id)) {
            Some(_) => Err(invalid("unknown node")),
            None => Ok(()),
        }
    }
}

fn write_opt<W: Write, T: Display>(out: &mut W, key: &str, value: Option<T>) -> io::Result<()> {
    match value {
        Some(v) => write!(out, " {key}={v}"),
        None => Ok(()),
    }
}

fn invalid(message: impl Into<String>) -> crate::error::EmvoxError {
    ExportError::InvalidDeck(message.into()).into()
}

/// Reads a FastHenry deck.
///
/// Directives are case-insensitive, `*` starts a comment line and `+`
/// continues the previous line. Reading stops at `.end`.
///
/// # Errors
///
/// Returns [`ExportError::Parse`] with the 1-based line number of the first
/// malformed or unsupported statement.
pub fn read_fasthenry(text: &str) -> Result<FastHenryDeck> {
    let mut statements: Vec<(usize, String)> = Vec::new();
    for (offset, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('*') {
            continue;
        }
        if let Some(rest) = line.strip_prefix('+') {
            match statements.last_mut() {
                Some((_, prev)) => {
                    prev.push(' ');
                    prev.push_str(rest);
                }
                None => return Err(parse_error(offset + 1, "continuation without a statement")),
            }
            continue;
        }
        statements.push((offset + 1, line.to_string()));
    }

    let mut deck = FastHenryDeck::new(Units::Mm)?;
    for (line, statement) in &statements {
        let line = *line;
        let tokens: Vec<&str> = statement.split_whitespace().collect();
        let Some(head) = tokens.first() else { continue };
        let lower = head.to_ascii_lowercase();
        match lower.as_str() {
            ".end" => break,
            ".units" => {
                let name = tokens.get(1).ok_or_else(|| parse_error(line, "missing unit"))?;
                let units: Units = name.parse().map_err(|message: String| parse_error(line, message))?;
                if units == Units::Nm {
                    return Err(parse_error(line, "FastHenry has no 'nm' unit"));
                }
                deck.units = units;
                deck.defaults = FilamentDefaults::for_units(units);
            }
            ".default" => {
                for (key, value) in key_values(&tokens[1..], line)? {
                    let defaults = &mut deck.defaults;
                    match key.as_str() {
                        "sigma" => defaults.sigma = value,
                        "nhinc" => defaults.nhinc = count(value, line)?,
                        "nwinc" => defaults.nwinc = count(value, line)?,
                        "rh" => defaults.rh = value,
                        "rw" => defaults.rw = value,
                        // Other defaults (z, rho, ...) are not modeled.
                        _ => debug!(key = %key, "ignoring default"),
                    }
                }
            }
            ".equiv" => {
                let nodes = node_refs(&deck, &tokens[1..], line)?;
                if nodes.len() < 2 {
                    return Err(parse_error(line, ".equiv needs at least two nodes"));
                }
                for pair in nodes.windows(2) {
                    deck.add_equiv(pair[0], pair[1]).map_err(|err| parse_error(line, err.to_string()))?;
                }
            }
            ".external" => {
                let nodes = node_refs(&deck, tokens.get(1..3).unwrap_or(&[]), line)?;
                let [start, end] = nodes[..] else {
                    return Err(parse_error(line, ".external needs two nodes"));
                };
                deck.add_port(start, end).map_err(|err| parse_error(line, err.to_string()))?;
            }
            ".freq" => {
                for (key, value) in key_values(&tokens[1..], line)? {
                    match key.as_str() {
                        "fmin" => deck.frequency.fmin = value,
                        "fmax" => deck.frequency.fmax = value,
                        "ndec" => deck.frequency.ndec = value,
                        _ => return Err(parse_error(line, format!("unknown .freq key '{key}'"))),
                    }
                }
            }
            _ if lower.starts_with('n') => {
                let kv = key_values(&tokens[1..], line)?;
                let coord = |axis: &str| {
                    kv.iter()
                        .find(|(key, _)| key == axis)
                        .map(|(_, value)| *value)
                        .ok_or_else(|| parse_error(line, format!("node is missing {axis}=")))
                };
                let position = Point3::new(coord("x")?, coord("y")?, coord("z")?);
                deck.add_node(&head[1..], position)
                    .map_err(|err| parse_error(line, err.to_string()))?;
            }
            _ if lower.starts_with('e') => {
                let ends = node_refs(&deck, tokens.get(1..3).unwrap_or(&[]), line)?;
                let [start, end] = ends[..] else {
                    return Err(parse_error(line, "segment needs two nodes"));
                };
                let segment = parse_segment(&head[1..], start, end, &tokens[3..], line)?;
                deck.add_segment(segment).map_err(|err| parse_error(line, err.to_string()))?;
            }
            _ => return Err(parse_error(line, format!("unsupported statement '{head}'"))),
        }
    }
    debug!(
        nodes = deck.nodes.len(),
        segments = deck.segments.len(),
        "FastHenry deck read"
    );
    Ok(deck)
}

fn parse_segment(name: &str, start: NodeId, end: NodeId, tokens: &[&str], line: usize) -> Result<Segment> {
    let mut segment = Segment::new(name, start, end, 0.0, 0.0);
    let mut width_dir = Vector3::zeros();
    let mut has_width_dir = false;
    for (key, value) in key_values(tokens, line)? {
        match key.as_str() {
            "w" => segment.width = value,
            "h" => segment.height = value,
            "sigma" => segment.sigma = Some(value),
            "wx" | "wy" | "wz" => {
                let axis = usize::from(key.as_bytes()[1] - b'x');
                width_dir[axis] = value;
                has_width_dir = true;
            }
            "nhinc" => segment.nhinc = Some(count(value, line)?),
            "nwinc" => segment.nwinc = Some(count(value, line)?),
            "rh" => segment.rh = Some(value),
            "rw" => segment.rw = Some(value),
            _ => return Err(parse_error(line, format!("unknown segment key '{key}'"))),
        }
    }
    if has_width_dir {
        segment.width_dir = Some(width_dir);
    }
    Ok(segment)
}

/// `key=value` pairs with lowercase keys.
fn key_values(tokens: &[&str], line: usize) -> Result<Vec<(String, f64)>> {
    tokens
        .iter()
        .map(|t| -> Result<(String, f64)> {
            let (key, value) = t
                .split_once('=')
                .ok_or_else(|| parse_error(line, format!("expected key=value, got '{t}'")))?;
            let value: f64 = value
                .parse()
                .map_err(|_| parse_error(line, format!("invalid number '{value}'")))?;
            Ok((key.to_ascii_lowercase(), value))
        })
        .collect()
}

/// Resolves `N<name>` references.
fn node_refs(deck: &FastHenryDeck, tokens: &[&str], line: usize) -> Result<Vec<NodeId>> {
    tokens
        .iter()
        .map(|t| -> Result<NodeId> {
            let name = t
                .strip_prefix(['N', 'n'])
                .ok_or_else(|| parse_error(line, format!("expected a node, got '{t}'")))?;
            deck.node_by_name(name)
                .ok_or_else(|| parse_error(line, format!("unknown node '{t}'")))
        })
        .collect()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn count(value: f64, line: usize) -> Result<u32> {
    if value.fract() == 0.0 && (1.0..=f64::from(u32::MAX)).contains(&value) {
        Ok(value as u32)
    } else {
        Err(parse_error(line, format!("expected a positive integer, got {value}")))
    }
}

fn parse_error(line: usize, message: impl Into<String>) -> crate::error::EmvoxError {
    ExportError::Parse {
        line,
        message: message.into(),
    }
    .into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn loop_deck() -> FastHenryDeck {
        let mut deck = FastHenryDeck::new(Units::Mm).unwrap();
        let a = deck.add_node("in", p(0.0, 0.0, 0.0)).unwrap();
        let b = deck.add_node("corner", p(10.0, 0.0, 0.0)).unwrap();
        let c = deck.add_node("out", p(10.0, 5.25, 0.0)).unwrap();
        let c2 = deck.add_node("out sense", p(10.0, 5.25, 0.0)).unwrap();
        deck.add_segment(Segment::new("1", a, b, 0.5, 0.035)).unwrap();
        deck.add_segment(
            Segment::new("2", b, c, 0.5, 0.035)
                .with_sigma(5.8e4)
                .with_width_dir(Vector3::new(1.0, 0.0, 0.0))
                .with_filaments(3, 5)
                .with_ratios(1.5, 2.0),
        )
        .unwrap();
        deck.add_equiv(c, c2).unwrap();
        deck.add_port(a, c2).unwrap();
        deck.frequency = FrequencySweep {
            fmin: 1e3,
            fmax: 1e9,
            ndec: 2.0,
        };
        deck
    }

    fn written(deck: &FastHenryDeck) -> String {
        let mut buf = Vec::new();
        deck.write(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn deck_layout() {
        let text = written(&loop_deck());
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines.contains(&".units mm"));
        assert!(lines.contains(&".default sigma=58000 nhinc=1 nwinc=1 rh=2 rw=2"));
        assert!(lines.contains(&"Nout_sense x=10 y=5.25 z=0"));
        assert!(lines.contains(&"E1 Nin Ncorner w=0.5 h=0.035"));
        assert!(lines.contains(
            &"E2 Ncorner Nout w=0.5 h=0.035 sigma=58000 wx=1 wy=0 wz=0 nhinc=3 nwinc=5 rh=1.5 rw=2"
        ));
        assert!(lines.contains(&".equiv Nout Nout_sense"));
        assert!(lines.contains(&".external Nin Nout_sense"));
        assert!(lines.contains(&".freq fmin=1000 fmax=1000000000 ndec=2"));
        assert_eq!(lines.last(), Some(&".end"));

        let nodes = lines.iter().position(|l| *l == "* Nodes").unwrap();
        let segments = lines.iter().position(|l| *l == "* Segments").unwrap();
        let ports = lines.iter().position(|l| *l == "* Ports").unwrap();
        assert!(nodes < segments && segments < ports);
    }

    #[test]
    fn written_deck_reads_back() {
        let deck = loop_deck();
        let back = read_fasthenry(&written(&deck)).unwrap();
        assert_eq!(back.units, deck.units);
        assert_eq!(back.defaults, deck.defaults);
        assert_eq!(back.frequency, deck.frequency);
        let names = |d: &FastHenryDeck| d.nodes().map(|(_, n)| n.clone()).collect::<Vec<_>>();
        assert_eq!(names(&back), names(&deck));
        assert_eq!(back.segments(), deck.segments());
        assert_eq!(back.equivs(), deck.equivs());
        assert_eq!(back.ports(), deck.ports());
    }

    #[test]
    fn reader_handles_comments_case_and_continuations() {
        let text = "\
* title
.UNITS in
.Default SIGMA=1e5
nA x=0 y=0 z=0
NB x=1
+ y=2 z=3
eAB nA nB w=0.1
+ h=0.2 WX=0 wy=1 wz=0
.external NA NB
.end
Nignored x=9 y=9 z=9
";
        let deck = read_fasthenry(text).unwrap();
        assert_eq!(deck.units, Units::In);
        assert_relative_eq!(deck.defaults.sigma, 1e5);
        assert_eq!(deck.nodes().count(), 2);
        let b = deck.node_by_name("B").unwrap();
        assert_eq!(deck.node(b).unwrap().position, p(1.0, 2.0, 3.0));
        let seg = &deck.segments()[0];
        assert_eq!(seg.name, "AB");
        assert_relative_eq!(seg.height, 0.2);
        assert_eq!(seg.width_dir, Some(Vector3::new(0.0, 1.0, 0.0)));
        assert_eq!(deck.ports().len(), 1);
    }

    #[test]
    fn reader_reports_line_numbers() {
        let err = read_fasthenry("NA x=0 y=0 z=0\n\nE1 NA NB w=1 h=1\n").unwrap_err();
        assert!(err.to_string().starts_with("line 3:"), "{err}");
        let err = read_fasthenry("NA x=0 y=0\n").unwrap_err();
        assert!(err.to_string().contains("z="));
        let err = read_fasthenry(".include other.inp\n").unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }

    #[test]
    fn invalid_records_are_rejected() {
        let mut deck = FastHenryDeck::new(Units::Um).unwrap();
        let a = deck.add_node("a", p(0.0, 0.0, 0.0)).unwrap();
        let b = deck.add_node("b", p(1.0, 0.0, 0.0)).unwrap();
        assert!(deck.add_node("a", p(2.0, 0.0, 0.0)).is_err());
        assert!(deck.add_node("  ", p(2.0, 0.0, 0.0)).is_err());
        assert!(deck.add_segment(Segment::new("s", a, a, 1.0, 1.0)).is_err());
        assert!(deck.add_segment(Segment::new("s", a, b, 0.0, 1.0)).is_err());
        deck.add_segment(Segment::new("s", a, b, 1.0, 1.0)).unwrap();
        assert!(deck.add_segment(Segment::new("s", b, a, 1.0, 1.0)).is_err());
        assert!(deck.add_port(a, a).is_err());

        let mut other = FastHenryDeck::new(Units::Um).unwrap();
        for name in ["x", "y"] {
            other.add_node(name, p(0.0, 0.0, 0.0)).unwrap();
        }
        let third = other.add_node("z", p(0.0, 0.0, 0.0)).unwrap();
        assert!(deck.add_equiv(a, third).is_err());
        assert!(deck.equivs().is_empty());

        assert!(FastHenryDeck::new(Units::Nm).is_err());
    }

    #[test]
    fn settings_carry_units_and_sweep() {
        let settings = SolverSettings {
            units: Units::Cm,
            ..SolverSettings::default()
        };
        let deck = FastHenryDeck::from_settings(&settings).unwrap();
        assert_eq!(deck.units, Units::Cm);
        assert_relative_eq!(deck.defaults.sigma, 5.8e5);
        assert_relative_eq!(deck.frequency.fmin, 2.5e9);
        assert!(FastHenryDeck::from_settings(&SolverSettings::default()).is_ok());
    }
}
