//! Line-oriented topology file format: loading and saving.
//!
//! Blank lines and lines starting with `;` are ignored. Each significant
//! line is one directive with whitespace-separated `key=value` fields:
//!
//! ```text
//! LOADING_RAMP id=1 delivery-interval=3
//! WORKER id=1 processing-time=2 queue-type=FIFO
//! STOREHOUSE id=1
//! LINK src=ramp-1 dest=worker-1
//! ```
//!
//! Declarations must precede the links that reference them. The saver
//! emits blocks in declaration order with `;` comment headers, each
//! block sorted by id.

use crate::buffer::{PackageBuffer, QueueDiscipline};
use crate::factory::{Factory, FactoryError};
use crate::id::{ElementId, NodeHandle, NodeKind};
use crate::nodes::{LoadingRamp, Storehouse, Worker};
use std::io::{self, BufRead, Write};
use tracing::debug;

/// Errors raised while loading a topology file. Every variant except
/// I/O carries the 1-based line number of the offending directive.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("line {line}: unknown directive '{directive}'")]
    UnknownDirective { line: usize, directive: String },
    #[error("line {line}: missing field '{field}'")]
    MissingField { line: usize, field: &'static str },
    #[error("line {line}: invalid value '{value}' for field '{field}'")]
    InvalidValue {
        line: usize,
        field: &'static str,
        value: String,
    },
    #[error("line {line}: duplicate {kind} id {id}")]
    DuplicateId {
        line: usize,
        kind: NodeKind,
        id: ElementId,
    },
    #[error("line {line}: link references undeclared node {handle}")]
    UndeclaredNode { line: usize, handle: NodeHandle },
    #[error("line {line}: {src} cannot be a link source")]
    InvalidLinkSource { line: usize, src: NodeHandle },
    #[error("line {line}: {dest} cannot be a link destination")]
    InvalidLinkDestination { line: usize, dest: NodeHandle },
}

/// Build a factory from its textual description.
pub fn load_factory_structure<R: BufRead>(input: R) -> Result<Factory, ParseError> {
    let mut factory = Factory::new();

    for (index, line) in input.lines().enumerate() {
        let line_no = index + 1;
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let directive = tokens.next().unwrap_or_default();
        let fields: Vec<&str> = tokens.collect();

        match directive {
            "LOADING_RAMP" => {
                let id = parse_field(&fields, "id", line_no)?;
                let interval = parse_field(&fields, "delivery-interval", line_no)?;
                if interval == 0 {
                    return Err(ParseError::InvalidValue {
                        line: line_no,
                        field: "delivery-interval",
                        value: "0".into(),
                    });
                }
                factory
                    .add_ramp(LoadingRamp::new(id, interval))
                    .map_err(|e| duplicate(e, line_no))?;
            }
            "WORKER" => {
                let id = parse_field(&fields, "id", line_no)?;
                let duration = parse_field(&fields, "processing-time", line_no)?;
                if duration == 0 {
                    return Err(ParseError::InvalidValue {
                        line: line_no,
                        field: "processing-time",
                        value: "0".into(),
                    });
                }
                let raw = field_value(&fields, "queue-type", line_no)?;
                let discipline = QueueDiscipline::from_str_opt(raw).ok_or_else(|| {
                    ParseError::InvalidValue {
                        line: line_no,
                        field: "queue-type",
                        value: raw.to_owned(),
                    }
                })?;
                factory
                    .add_worker(Worker::new(id, duration, PackageBuffer::new(discipline)))
                    .map_err(|e| duplicate(e, line_no))?;
            }
            "STOREHOUSE" => {
                let id = parse_field(&fields, "id", line_no)?;
                factory
                    .add_storehouse(Storehouse::new(id))
                    .map_err(|e| duplicate(e, line_no))?;
            }
            "LINK" => {
                let src = parse_endpoint(&fields, "src", line_no)?;
                let dest = parse_endpoint(&fields, "dest", line_no)?;
                if !src.kind.is_sender() {
                    return Err(ParseError::InvalidLinkSource { line: line_no, src });
                }
                if !dest.kind.is_receiver() {
                    return Err(ParseError::InvalidLinkDestination { line: line_no, dest });
                }
                if !factory.contains(src) {
                    return Err(ParseError::UndeclaredNode { line: line_no, handle: src });
                }
                if !factory.contains(dest) {
                    return Err(ParseError::UndeclaredNode { line: line_no, handle: dest });
                }
                // Both endpoints were validated above, so this cannot fail.
                factory
                    .link(src, dest)
                    .map_err(|_| ParseError::UndeclaredNode { line: line_no, handle: dest })?;
            }
            _ => {
                return Err(ParseError::UnknownDirective {
                    line: line_no,
                    directive: directive.to_owned(),
                })
            }
        }
    }

    debug!(
        ramps = factory.ramps().count(),
        workers = factory.workers().count(),
        storehouses = factory.storehouses().count(),
        "loaded factory structure"
    );
    Ok(factory)
}

fn field_value<'a>(
    fields: &[&'a str],
    key: &'static str,
    line: usize,
) -> Result<&'a str, ParseError> {
    fields
        .iter()
        .find_map(|f| f.strip_prefix(key).and_then(|rest| rest.strip_prefix('=')))
        .ok_or(ParseError::MissingField { line, field: key })
}

fn parse_field(fields: &[&str], key: &'static str, line: usize) -> Result<u64, ParseError> {
    let raw = field_value(fields, key, line)?;
    raw.parse().map_err(|_| ParseError::InvalidValue {
        line,
        field: key,
        value: raw.to_owned(),
    })
}

/// Parse a `<tag>-<n>` link endpoint, e.g. `worker-3`.
fn parse_endpoint(
    fields: &[&str],
    key: &'static str,
    line: usize,
) -> Result<NodeHandle, ParseError> {
    let raw = field_value(fields, key, line)?;
    let invalid = || ParseError::InvalidValue {
        line,
        field: key,
        value: raw.to_owned(),
    };
    let (tag, id) = raw.rsplit_once('-').ok_or_else(invalid)?;
    let kind = NodeKind::from_tag(tag).ok_or_else(invalid)?;
    let id: ElementId = id.parse().map_err(|_| invalid())?;
    Ok(NodeHandle::new(kind, id))
}

fn duplicate(err: FactoryError, line: usize) -> ParseError {
    match err {
        FactoryError::DuplicateId { kind, id } => ParseError::DuplicateId { line, kind, id },
        // add_* only fails on duplicates; keep the line number either way.
        other => ParseError::InvalidValue {
            line,
            field: "id",
            value: other.to_string(),
        },
    }
}

/// Write the factory as a loadable topology file: declarations in the
/// order LOADING_RAMP, WORKER, STOREHOUSE, LINK, each block sorted by
/// id and links by (source tag, source id, destination tag, destination
/// id).
pub fn save_factory_structure<W: Write>(factory: &Factory, out: &mut W) -> io::Result<()> {
    writeln!(out, "; == LOADING RAMPS ==")?;
    writeln!(out)?;
    for ramp in factory.ramps() {
        writeln!(
            out,
            "LOADING_RAMP id={} delivery-interval={}",
            ramp.id(),
            ramp.delivery_interval()
        )?;
    }

    writeln!(out)?;
    writeln!(out, "; == WORKERS ==")?;
    writeln!(out)?;
    for worker in factory.workers() {
        writeln!(
            out,
            "WORKER id={} processing-time={} queue-type={}",
            worker.id(),
            worker.processing_duration(),
            worker.queue().discipline()
        )?;
    }

    writeln!(out)?;
    writeln!(out, "; == STOREHOUSES ==")?;
    writeln!(out)?;
    for storehouse in factory.storehouses() {
        writeln!(out, "STOREHOUSE id={}", storehouse.id())?;
    }

    writeln!(out)?;
    writeln!(out, "; == LINKS ==")?;
    writeln!(out)?;
    for ramp in factory.ramps() {
        for dest in ramp.preferences().receivers() {
            writeln!(
                out,
                "LINK src=ramp-{} dest={}-{}",
                ramp.id(),
                dest.kind.tag(),
                dest.id
            )?;
        }
    }
    for worker in factory.workers() {
        for dest in worker.preferences().receivers() {
            writeln!(
                out,
                "LINK src=worker-{} dest={}-{}",
                worker.id(),
                dest.kind.tag(),
                dest.id
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn load(text: &str) -> Result<Factory, ParseError> {
        load_factory_structure(Cursor::new(text))
    }

    const SAMPLE: &str = "\
; a small two-stage line
LOADING_RAMP id=1 delivery-interval=3
LOADING_RAMP id=2 delivery-interval=2

WORKER id=1 processing-time=2 queue-type=FIFO
WORKER id=2 processing-time=1 queue-type=LIFO

STOREHOUSE id=1

LINK src=ramp-1 dest=worker-1
LINK src=ramp-2 dest=worker-1
LINK src=worker-1 dest=worker-2
LINK src=worker-2 dest=store-1
";

    #[test]
    fn loads_a_complete_structure() {
        let factory = load(SAMPLE).unwrap();
        assert_eq!(factory.ramps().count(), 2);
        assert_eq!(factory.workers().count(), 2);
        assert_eq!(factory.storehouses().count(), 1);

        let ramp = factory.find_ramp_by_id(1).unwrap();
        assert_eq!(ramp.delivery_interval(), 3);
        assert!(ramp.preferences().contains(&NodeHandle::worker(1)));

        let worker = factory.find_worker_by_id(2).unwrap();
        assert_eq!(worker.queue().discipline(), QueueDiscipline::Lifo);
        assert!(worker.preferences().contains(&NodeHandle::storehouse(1)));

        assert!(factory.is_consistent());
    }

    #[test]
    fn comments_and_blank_lines_ignored() {
        let factory = load("; nothing but comments\n\n;\n").unwrap();
        assert_eq!(factory.ramps().count(), 0);
    }

    #[test]
    fn unknown_directive_fails() {
        let err = load("CONVEYOR id=1\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnknownDirective { line: 1, .. }
        ));
    }

    #[test]
    fn missing_field_fails() {
        let err = load("LOADING_RAMP id=1\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::MissingField { line: 1, field: "delivery-interval" }
        ));
    }

    #[test]
    fn malformed_number_fails() {
        let err = load("STOREHOUSE id=abc\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { line: 1, field: "id", .. }));
    }

    #[test]
    fn zero_interval_fails() {
        let err = load("LOADING_RAMP id=1 delivery-interval=0\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidValue { field: "delivery-interval", .. }
        ));
    }

    #[test]
    fn bad_queue_type_fails() {
        let err = load("WORKER id=1 processing-time=1 queue-type=DEQUE\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidValue { field: "queue-type", .. }
        ));
    }

    #[test]
    fn duplicate_id_fails_with_line() {
        let err = load("STOREHOUSE id=1\nSTOREHOUSE id=1\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::DuplicateId { line: 2, kind: NodeKind::Storehouse, id: 1 }
        ));
    }

    #[test]
    fn link_to_undeclared_node_fails() {
        let err = load("LOADING_RAMP id=1 delivery-interval=1\nLINK src=ramp-1 dest=worker-1\n")
            .unwrap_err();
        assert!(matches!(err, ParseError::UndeclaredNode { line: 2, .. }));
    }

    #[test]
    fn storehouse_as_source_fails() {
        let text = "STOREHOUSE id=1\nWORKER id=1 processing-time=1 queue-type=FIFO\n\
                    LINK src=store-1 dest=worker-1\n";
        let err = load(text).unwrap_err();
        assert!(matches!(err, ParseError::InvalidLinkSource { line: 3, .. }));
    }

    #[test]
    fn ramp_as_destination_fails() {
        let text = "LOADING_RAMP id=1 delivery-interval=1\nWORKER id=1 processing-time=1 queue-type=FIFO\n\
                    LINK src=worker-1 dest=ramp-1\n";
        let err = load(text).unwrap_err();
        assert!(matches!(err, ParseError::InvalidLinkDestination { line: 3, .. }));
    }

    #[test]
    fn save_emits_sorted_blocks() {
        let factory = load(SAMPLE).unwrap();
        let mut buf = Vec::new();
        save_factory_structure(&factory, &mut buf).unwrap();
        let saved = String::from_utf8(buf).unwrap();

        assert_eq!(
            saved,
            "; == LOADING RAMPS ==\n\
             \n\
             LOADING_RAMP id=1 delivery-interval=3\n\
             LOADING_RAMP id=2 delivery-interval=2\n\
             \n\
             ; == WORKERS ==\n\
             \n\
             WORKER id=1 processing-time=2 queue-type=FIFO\n\
             WORKER id=2 processing-time=1 queue-type=LIFO\n\
             \n\
             ; == STOREHOUSES ==\n\
             \n\
             STOREHOUSE id=1\n\
             \n\
             ; == LINKS ==\n\
             \n\
             LINK src=ramp-1 dest=worker-1\n\
             LINK src=ramp-2 dest=worker-1\n\
             LINK src=worker-1 dest=worker-2\n\
             LINK src=worker-2 dest=store-1\n"
        );
    }

    #[test]
    fn save_load_round_trip() {
        let original = load(SAMPLE).unwrap();
        let mut buf = Vec::new();
        save_factory_structure(&original, &mut buf).unwrap();
        let reloaded = load_factory_structure(Cursor::new(&buf)).unwrap();

        let mut buf2 = Vec::new();
        save_factory_structure(&reloaded, &mut buf2).unwrap();
        assert_eq!(buf, buf2);
    }
}
