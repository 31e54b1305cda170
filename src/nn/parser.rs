//! Reader and writer for the plain-text neural-net weight format.
//!
//! ```text
//! <free text, ended by a line containing '#'>
//! n_in
//! in_min in_max          (n_in lines)
//! n_out
//! out_min out_max        (n_out lines)
//! <free text up to a line containing '='>
//! ...=n_planes size_0 ... size_{n_planes-1}
//! <label> then size[p+1] biases                    (n_planes - 1 blocks)
//! <label> then size[p+1] rows of size[p] weights   (n_planes - 1 blocks)
//! ```
//!
//! Bias and weight values are whitespace separated and may be spread over any
//! number of lines. A label line always starts a fresh block.

use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::iter::{Enumerate, Peekable};
use std::path::Path;
use std::str::{FromStr, Lines};

use super::error::NetError;
use super::network::NeuralNet;

impl NeuralNet {
    /// Reads a network from a weight file on disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, NetError> {
        let text = fs::read_to_string(path)?;
        text.parse()
    }
}

impl FromStr for NeuralNet {
    type Err = NetError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut cursor = Cursor::new(text);

        cursor.skip_past('#', NetError::MissingHeader)?;

        let n_in = cursor.next_usize("input count")?;
        let in_range = cursor.read_ranges("input", n_in)?;
        let n_out = cursor.next_usize("output count")?;
        let out_range = cursor.read_ranges("output", n_out)?;

        let (line_no, line) = cursor.skip_past('=', NetError::MissingTopology)?;
        let after_eq = line.split_once('=').map_or("", |(_, rest)| rest);
        cursor.push_tokens(line_no, after_eq);

        let n_planes = cursor.next_usize("plane count")?;
        if n_planes < 2 {
            return Err(NetError::InvalidTopology(format!(
                "at least 2 planes required, got {}",
                n_planes
            )));
        }
        let sizes = (0..n_planes)
            .map(|_| cursor.next_usize("plane sizes"))
            .collect::<Result<Vec<_>, _>>()?;

        let mut biases = Vec::with_capacity(n_planes - 1);
        for &n_next in &sizes[1..] {
            cursor.next_line("bias label")?;
            biases.push(cursor.next_values(n_next, "bias values")?);
        }

        let mut weights = Vec::with_capacity(n_planes - 1);
        for pair in sizes.windows(2) {
            let (n_prev, n_next) = (pair[0], pair[1]);
            cursor.next_line("weight label")?;
            let rows = (0..n_next)
                .map(|_| cursor.next_values(n_prev, "weight values"))
                .collect::<Result<Vec<_>, _>>()?;
            weights.push(rows);
        }

        NeuralNet::new(in_range, out_range, sizes, weights, biases)
    }
}

/// Writes the network in the same text format [`FromStr`] reads.
impl fmt::Display for NeuralNet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sizes = self.layer_sizes();
        writeln!(f, "neural net {}", join(sizes, "x"))?;
        writeln!(f, "#")?;

        writeln!(f, "{}", self.n_in())?;
        for (lo, hi) in self.in_min().iter().zip(self.in_max()) {
            writeln!(f, "{} {}", lo, hi)?;
        }
        writeln!(f, "{}", self.n_out())?;
        for (lo, hi) in self.out_min().iter().zip(self.out_max()) {
            writeln!(f, "{} {}", lo, hi)?;
        }

        writeln!(f, "$")?;
        writeln!(f, "#planes={} {}", sizes.len(), join(sizes, " "))?;

        let (weights, biases) = self.parameters();
        for (p, bias) in biases.iter().enumerate() {
            writeln!(f, "bias {} {}", p + 1, sizes[p + 1])?;
            for b in bias {
                writeln!(f, "{}", b)?;
            }
        }
        for (p, plane) in weights.iter().enumerate() {
            writeln!(f, "wgt {} {} {}", p, sizes[p], sizes[p + 1])?;
            for row in plane.chunks_exact(sizes[p]) {
                writeln!(f, "{}", join(row, " "))?;
            }
        }
        Ok(())
    }
}

fn join<T: fmt::Display>(values: &[T], sep: &str) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Line-aware token reader. Line numbers are 1-based.
struct Cursor<'a> {
    lines: Peekable<Enumerate<Lines<'a>>>,
    pending: VecDeque<&'a str>,
    pending_line: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate().peekable(),
            pending: VecDeque::new(),
            pending_line: 0,
        }
    }

    /// Consumes lines up to and including the first one containing `marker`.
    fn skip_past(&mut self, marker: char, missing: NetError) -> Result<(usize, &'a str), NetError> {
        self.pending.clear();
        self.lines
            .find(|(_, line)| line.contains(marker))
            .map(|(i, line)| (i + 1, line))
            .ok_or(missing)
    }

    /// Next non-blank line. Any unread tokens of the current line are dropped.
    fn next_line(&mut self, what: &'static str) -> Result<(usize, &'a str), NetError> {
        self.pending.clear();
        self.lines
            .find(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| (i + 1, line))
            .ok_or(NetError::UnexpectedEof(what))
    }

    fn peek_line(&mut self) -> Option<&'a str> {
        loop {
            let &(_, line) = self.lines.peek()?;
            if !line.trim().is_empty() {
                return Some(line);
            }
            self.lines.next();
        }
    }

    fn push_tokens(&mut self, line_no: usize, text: &'a str) {
        self.pending.extend(text.split_whitespace());
        self.pending_line = line_no;
    }

    fn next_token(&mut self, what: &'static str) -> Result<(usize, &'a str), NetError> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok((self.pending_line, token));
            }
            let (line_no, line) = self.next_line(what)?;
            self.push_tokens(line_no, line);
        }
    }

    fn next_usize(&mut self, what: &'static str) -> Result<usize, NetError> {
        let (line, token) = self.next_token(what)?;
        token.parse().map_err(|_| NetError::InvalidNumber {
            line,
            token: token.to_string(),
        })
    }

    fn next_f64(&mut self, what: &'static str) -> Result<f64, NetError> {
        let (line, token) = self.next_token(what)?;
        token.parse().map_err(|_| NetError::InvalidNumber {
            line,
            token: token.to_string(),
        })
    }

    fn next_values(&mut self, count: usize, what: &'static str) -> Result<Vec<f64>, NetError> {
        (0..count).map(|_| self.next_f64(what)).collect()
    }

    /// Reads every consecutive `min max` line and checks the count against
    /// the declared one, so both missing and surplus pairs are rejected.
    fn read_ranges(
        &mut self,
        kind: &'static str,
        declared: usize,
    ) -> Result<(Vec<f64>, Vec<f64>), NetError> {
        self.pending.clear();
        let mut min = Vec::with_capacity(declared);
        let mut max = Vec::with_capacity(declared);

        while let Some((lo, hi)) = self.peek_line().and_then(parse_pair) {
            self.lines.next();
            min.push(lo);
            max.push(hi);
        }

        if min.len() != declared {
            return Err(NetError::RangeCountMismatch {
                kind,
                declared,
                found: min.len(),
            });
        }
        Ok((min, max))
    }
}

fn parse_pair(line: &str) -> Option<(f64, f64)> {
    let mut tokens = line.split_whitespace();
    let lo = tokens.next()?.parse().ok()?;
    let hi = tokens.next()?.parse().ok()?;
    match tokens.next() {
        Some(_) => None,
        None => Some((lo, hi)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::activation::ActivationMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FIXTURE: &str = "\
problem: synthetic 2x2x1 test net
input  1 is a in [0.000000,1.000000]
input  2 is b in [0.000000,1.000000]
output 1 is c in [0.000000,1.000000]
#
2
0.0 1.0
0.0 1.0
1
0.0 1.0
$
#planes=3 2 2 1
bias 1 2
0.0
-0.5
bias 2 1
0.1
wgt 0 2 2
1.0
-1.0
0.5
0.5
wgt 1 2 1
2.0
-1.0
";

    #[test]
    fn test_parse_fixture() {
        let net: NeuralNet = FIXTURE.parse().unwrap();
        assert_eq!(net.n_in(), 2);
        assert_eq!(net.n_out(), 1);
        assert_eq!(net.layer_sizes(), &[2, 2, 1]);

        let net = net.with_activation(ActivationMode::Exact);
        let out = net.forward(&[0.5, 0.5]);
        assert!((out[0] - 0.6456563062257954).abs() < 1e-12);
    }

    #[test]
    fn test_equal_input_bounds_are_rejected() {
        let flat = FIXTURE.replacen("2\n0.0 1.0\n0.0 1.0\n", "2\n0.0 1.0\n0.5 0.5\n", 1);
        assert_ne!(flat, FIXTURE);
        let err = flat.parse::<NeuralNet>().unwrap_err();
        assert!(matches!(err, NetError::DegenerateRange { index: 1, .. }));
        assert_eq!(err.to_string(), "input 1 has a degenerate range [0.5, 0.5]");
    }

    #[test]
    fn test_values_may_share_lines() {
        let packed = FIXTURE
            .replace("0.0\n-0.5\n", "0.0 -0.5\n")
            .replace("1.0\n-1.0\n0.5\n0.5\n", "1.0 -1.0 0.5\n0.5\n");
        let a: NeuralNet = FIXTURE.parse().unwrap();
        let b: NeuralNet = packed.parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_display_round_trip() {
        let net: NeuralNet = FIXTURE.parse().unwrap();
        let reparsed: NeuralNet = net.to_string().parse().unwrap();
        assert_eq!(net, reparsed);
    }

    #[test]
    fn test_missing_input_range() {
        let text = FIXTURE.replacen("2\n0.0 1.0\n0.0 1.0\n", "3\n0.0 1.0\n0.0 1.0\n", 1);
        match text.parse::<NeuralNet>() {
            Err(NetError::RangeCountMismatch {
                kind,
                declared,
                found,
            }) => {
                assert_eq!(kind, "input");
                assert_eq!(declared, 3);
                assert_eq!(found, 2);
            }
            other => panic!("expected range mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_surplus_output_range() {
        let text = FIXTURE.replace("1\n0.0 1.0\n$", "1\n0.0 1.0\n0.0 2.0\n$");
        assert!(matches!(
            text.parse::<NeuralNet>(),
            Err(NetError::RangeCountMismatch {
                kind: "output",
                declared: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn test_missing_header() {
        let err = "2\n0 1\n0 1\n".parse::<NeuralNet>().unwrap_err();
        assert!(matches!(err, NetError::MissingHeader));
    }

    #[test]
    fn test_missing_topology() {
        let cut = FIXTURE.find("#planes").unwrap();
        let err = FIXTURE[..cut].parse::<NeuralNet>().unwrap_err();
        assert!(matches!(err, NetError::MissingTopology));
    }

    #[test]
    fn test_truncated_weights() {
        let cut = FIXTURE.rfind("-1.0").unwrap();
        let err = FIXTURE[..cut].parse::<NeuralNet>().unwrap_err();
        assert!(matches!(err, NetError::UnexpectedEof("weight values")));
    }

    #[test]
    fn test_invalid_number_reports_line() {
        let text = FIXTURE.replace("-0.5\n", "-0.5x\n");
        match text.parse::<NeuralNet>() {
            Err(NetError::InvalidNumber { line, token }) => {
                assert_eq!(token, "-0.5x");
                assert_eq!(line, 15);
            }
            other => panic!("expected invalid number, got {:?}", other),
        }
    }

    #[test]
    fn test_plane_sizes_must_match_ranges() {
        let text = FIXTURE.replace("#planes=3 2 2 1", "#planes=3 3 2 1");
        assert!(matches!(
            text.parse::<NeuralNet>(),
            Err(NetError::InvalidTopology(_)) | Err(NetError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();

        let net = NeuralNet::from_file(file.path()).unwrap();
        assert_eq!(net.layer_sizes(), &[2, 2, 1]);

        let missing = NeuralNet::from_file(file.path().with_extension("absent"));
        assert!(matches!(missing, Err(NetError::Io(_))));
    }
}
