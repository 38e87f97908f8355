
use inventory_dump::channel::RecordRx;
use inventory_dump::record::Record;

/// The channel capacity used by the tests.
///
/// It is large enough for every scenario to run to completion before the test starts
/// draining records, which keeps the assertions free of consumer timing.
pub const CHANNEL_CAPACITY: usize = 64;

/// Drains `rx` until the sending side is gone and returns everything it delivered.
///
/// Callers must drop the dumper first, since the dumper holds the sending half of
/// the channel for as long as it is alive.
pub async fn collect_records(mut rx: RecordRx) -> Vec<Record> {
    let mut records = Vec::new();
    while let Some(record) = rx.recv().await {
        records.push(record);
    }

    records
}
