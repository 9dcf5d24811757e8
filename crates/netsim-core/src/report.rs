//! Text reports: the structural report and the per-turn state report.
//!
//! Layout follows the reference formatter: section headers per node
//! kind, nodes in ascending id order, receivers sorted by (kind, id)
//! with the kind names `storehouse` and `worker` ordering
//! lexicographically. The preference maps already iterate in that
//! order, so the writers just walk them.

use crate::factory::Factory;
use crate::id::Time;
use crate::package::Package;
use crate::preferences::ReceiverPreferences;
use std::io::{self, Write};

/// Write the structural report: every node with its configuration and
/// receiver list.
pub fn write_structure_report<W: Write>(factory: &Factory, out: &mut W) -> io::Result<()> {
    writeln!(out, "== LOADING RAMPS ==")?;
    for ramp in factory.ramps() {
        writeln!(out, "\nLOADING RAMP #{}", ramp.id())?;
        writeln!(out, "  Delivery interval: {}", ramp.delivery_interval())?;
        write_receivers(ramp.preferences(), out)?;
    }

    writeln!(out, "\n\n== WORKERS ==")?;
    for worker in factory.workers() {
        writeln!(out, "\nWORKER #{}", worker.id())?;
        writeln!(out, "  Processing time: {}", worker.processing_duration())?;
        writeln!(out, "  Queue type: {}", worker.queue().discipline())?;
        write_receivers(worker.preferences(), out)?;
    }

    writeln!(out, "\n\n== STOREHOUSES ==")?;
    for storehouse in factory.storehouses() {
        writeln!(out, "\nSTOREHOUSE #{}", storehouse.id())?;
    }
    writeln!(out)
}

fn write_receivers<W: Write>(preferences: &ReceiverPreferences, out: &mut W) -> io::Result<()> {
    writeln!(out, "  Receivers:")?;
    for handle in preferences.receivers() {
        writeln!(out, "    {handle}")?;
    }
    Ok(())
}

/// Write the per-turn report: worker buffers and queues, storehouse
/// stocks.
pub fn write_turn_report<W: Write>(factory: &Factory, out: &mut W, t: Time) -> io::Result<()> {
    writeln!(out, "=== [ Turn: {t} ] ===")?;

    writeln!(out, "\n== WORKERS ==")?;
    for worker in factory.workers() {
        writeln!(out, "\nWORKER #{}", worker.id())?;

        match (worker.processing_buffer(), worker.processing_time(t)) {
            (Some(package), Some(pt)) => {
                writeln!(out, "  PBuffer: #{} (pt = {pt})", package.id())?;
            }
            _ => writeln!(out, "  PBuffer: (empty)")?,
        }

        if worker.queue().is_empty() {
            writeln!(out, "  Queue: (empty)")?;
        } else {
            write!(out, "  Queue: ")?;
            write_package_list(worker.queue().iter(), out)?;
        }

        match worker.sending_buffer() {
            Some(package) => writeln!(out, "  SBuffer: #{}", package.id())?,
            None => writeln!(out, "  SBuffer: (empty)")?,
        }
    }

    writeln!(out, "\n\n== STOREHOUSES ==")?;
    for storehouse in factory.storehouses() {
        writeln!(out, "\nSTOREHOUSE #{}", storehouse.id())?;
        if storehouse.stock().is_empty() {
            writeln!(out, "  Stock: (empty)")?;
        } else {
            write!(out, "  Stock: ")?;
            write_package_list(storehouse.stock().iter(), out)?;
        }
    }
    writeln!(out)
}

fn write_package_list<'a, W, I>(packages: I, out: &mut W) -> io::Result<()>
where
    W: Write,
    I: Iterator<Item = &'a Package>,
{
    let ids: Vec<String> = packages.map(|p| format!("#{}", p.id())).collect();
    writeln!(out, "{}", ids.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::QueueDiscipline;
    use crate::id::NodeHandle;
    use crate::test_utils::*;

    fn render_structure(factory: &Factory) -> String {
        let mut buf = Vec::new();
        write_structure_report(factory, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn render_turn(factory: &Factory, t: Time) -> String {
        let mut buf = Vec::new();
        write_turn_report(factory, &mut buf, t).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn structure_report_layout() {
        let mut f = Factory::new();
        add_ramp(&mut f, 1, 2);
        add_worker(&mut f, 1, 3);
        add_storehouse(&mut f, 1);
        link(&mut f, NodeHandle::ramp(1), NodeHandle::worker(1));
        link(&mut f, NodeHandle::worker(1), NodeHandle::storehouse(1));

        let report = render_structure(&f);
        assert_eq!(
            report,
            "== LOADING RAMPS ==\n\
             \nLOADING RAMP #1\n\
             \x20 Delivery interval: 2\n\
             \x20 Receivers:\n\
             \x20   worker #1\n\
             \n\n== WORKERS ==\n\
             \nWORKER #1\n\
             \x20 Processing time: 3\n\
             \x20 Queue type: FIFO\n\
             \x20 Receivers:\n\
             \x20   storehouse #1\n\
             \n\n== STOREHOUSES ==\n\
             \nSTOREHOUSE #1\n\n"
        );
    }

    #[test]
    fn receivers_listed_storehouse_before_worker() {
        let mut f = Factory::new();
        add_ramp(&mut f, 1, 1);
        add_worker(&mut f, 2, 1);
        add_storehouse(&mut f, 5);
        link(&mut f, NodeHandle::ramp(1), NodeHandle::worker(2));
        link(&mut f, NodeHandle::ramp(1), NodeHandle::storehouse(5));

        let report = render_structure(&f);
        let storehouse_pos = report.find("storehouse #5").unwrap();
        let worker_pos = report.find("worker #2").unwrap();
        assert!(storehouse_pos < worker_pos);
    }

    #[test]
    fn turn_report_empty_worker_and_storehouse() {
        let f = pipeline(1, 1);
        let report = render_turn(&f, 1);
        assert_eq!(
            report,
            "=== [ Turn: 1 ] ===\n\
             \n== WORKERS ==\n\
             \nWORKER #1\n\
             \x20 PBuffer: (empty)\n\
             \x20 Queue: (empty)\n\
             \x20 SBuffer: (empty)\n\
             \n\n== STOREHOUSES ==\n\
             \nSTOREHOUSE #1\n\
             \x20 Stock: (empty)\n\n"
        );
    }

    #[test]
    fn turn_report_shows_processing_time() {
        let mut f = pipeline(1, 3);
        f.do_deliveries(1);
        f.do_package_passing().unwrap();
        f.do_work(1);

        let report = render_turn(&f, 1);
        assert!(report.contains("PBuffer: #"), "report was:\n{report}");
        assert!(report.contains("(pt = 1)"), "report was:\n{report}");

        f.do_deliveries(2);
        f.do_package_passing().unwrap();
        f.do_work(2);
        let report = render_turn(&f, 2);
        assert!(report.contains("(pt = 2)"), "report was:\n{report}");
    }

    #[test]
    fn turn_report_lists_queue_in_pop_order() {
        let mut f = Factory::new();
        add_storehouse(&mut f, 1);
        let mut worker = crate::nodes::Worker::new(
            1,
            5,
            crate::buffer::PackageBuffer::new(QueueDiscipline::Lifo),
        );
        worker.receive(crate::package::Package::with_id(10));
        worker.receive(crate::package::Package::with_id(11));
        f.add_worker(worker).unwrap();

        let report = render_turn(&f, 1);
        assert!(report.contains("Queue: #11, #10"), "report was:\n{report}");
    }

    #[test]
    fn turn_report_lists_stock_in_arrival_order() {
        let mut f = Factory::new();
        add_storehouse(&mut f, 1);
        let store = f.find_storehouse_by_id_mut(1).unwrap();
        store.receive(crate::package::Package::with_id(4));
        store.receive(crate::package::Package::with_id(2));

        let report = render_turn(&f, 1);
        assert!(report.contains("Stock: #4, #2"), "report was:\n{report}");
    }
}
