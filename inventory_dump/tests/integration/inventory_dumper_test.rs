use std::collections::HashMap;
use std::ops::Range;

use inventory_dump::channel::create_record_channel;
use inventory_dump::config::{DataSourceConfig, DataSourceKind, DumperConfig};
use inventory_dump::conversions::Cell;
use inventory_dump::dumper::{DumpError, DumperBuildError, InventoryDumper};
use inventory_dump::lifecycle::DumperState;
use inventory_dump::position::{DumpPosition, PrimaryKeyPosition};
use inventory_dump::record::{ChangeType, DataRecord, FinishedRecord, Record};
use inventory_dump::sources::{DataSourceProvider, SourceError};
use postgres::schema::TableSchema;

use crate::common::source::{int8_column, orders_schema, test_table_name, TestSourceProvider};
use crate::common::{collect_records, CHANNEL_CAPACITY};

fn standard_data_source() -> DataSourceConfig {
    DataSourceConfig::Standard {
        host: "localhost".to_string(),
        port: 5432,
        name: "orders_db".to_string(),
        username: "dumper".to_string(),
        password: None,
    }
}

fn sharded_data_source() -> DataSourceConfig {
    DataSourceConfig::Sharded {
        rule: "hash(id) % 4".to_string(),
    }
}

fn orders_config(
    primary_key: Option<&str>,
    position: Option<PrimaryKeyPosition>,
) -> DumperConfig {
    DumperConfig {
        data_source: standard_data_source(),
        table_name: test_table_name("orders"),
        table_name_map: HashMap::new(),
        primary_key: primary_key.map(str::to_string),
        position,
    }
}

fn orders_provider(ids: Range<i64>) -> TestSourceProvider {
    let rows = ids
        .map(|id| vec![Cell::I64(id), Cell::String(format!("item-{id}"))])
        .collect();
    TestSourceProvider::new(orders_schema(), rows)
}

fn data_record(record: &Record) -> &DataRecord {
    let Record::Data(data) = record else {
        panic!("expected a data record, got {record:?}");
    };
    data
}

#[tokio::test]
async fn full_scan_pushes_every_row_and_both_finished_markers() {
    let provider = orders_provider(1..6);
    let mut dumper = InventoryDumper::new(orders_config(None, None), provider.clone())
        .await
        .unwrap();
    let handle = dumper.handle();

    let (channel, rx) = create_record_channel(CHANNEL_CAPACITY);
    dumper.set_channel(channel);
    dumper.start().await.unwrap();
    drop(dumper);

    assert_eq!(handle.state(), DumperState::Finished);

    let records = collect_records(rx).await;
    assert_eq!(records.len(), 7);

    for (i, record) in records[..5].iter().enumerate() {
        let data = data_record(record);
        assert_eq!(data.position, DumpPosition::Placeholder);
        assert_eq!(data.change_type, ChangeType::Insert);
        assert_eq!(data.table_name, "orders");
        assert_eq!(data.columns[0].value, Cell::I64(i as i64 + 1));
    }

    assert_eq!(records[5], Record::Finished(FinishedRecord::finished()));
    assert_eq!(records[6], Record::Finished(FinishedRecord::placeholder()));
}

#[tokio::test]
async fn ranged_scan_bounds_the_query_and_advances_positions() {
    let provider = orders_provider(10..21);
    let config = orders_config(Some("id"), Some(PrimaryKeyPosition::new(10, 20)));
    let mut dumper = InventoryDumper::new(config, provider.clone()).await.unwrap();

    let (channel, rx) = create_record_channel(CHANNEL_CAPACITY);
    dumper.set_channel(channel);
    dumper.start().await.unwrap();
    drop(dumper);

    assert_eq!(
        provider.executed_queries(),
        vec!["SELECT * FROM public.orders WHERE id BETWEEN 10 AND 20".to_string()]
    );

    let records = collect_records(rx).await;
    assert_eq!(records.len(), 13);

    for (record, id) in records[..11].iter().zip(10..) {
        let data = data_record(record);
        assert_eq!(
            data.position,
            DumpPosition::PrimaryKey(PrimaryKeyPosition::new(id, 20))
        );
    }

    assert_eq!(records[11], Record::Finished(FinishedRecord::finished()));
    assert_eq!(records[12], Record::Finished(FinishedRecord::placeholder()));
}

#[tokio::test]
async fn dumped_columns_carry_names_values_and_primary_key_membership() {
    assert!(orders_schema().has_primary_keys());

    let provider = orders_provider(1..2);
    let mut dumper = InventoryDumper::new(orders_config(None, None), provider.clone())
        .await
        .unwrap();

    let (channel, rx) = create_record_channel(CHANNEL_CAPACITY);
    dumper.set_channel(channel);
    dumper.start().await.unwrap();
    drop(dumper);

    let records = collect_records(rx).await;
    let data = data_record(&records[0]);

    assert_eq!(data.columns.len(), 2);
    assert!(data.columns.iter().all(|column| column.updated));
    assert_eq!(data.columns[0].name, "id");
    assert_eq!(data.columns[0].value, Cell::I64(1));
    assert!(data.columns[0].primary_key);
    assert_eq!(data.columns[1].name, "item");
    assert_eq!(data.columns[1].value, Cell::String("item-1".to_string()));
    assert!(!data.columns[1].primary_key);
}

#[tokio::test]
async fn data_access_error_stops_the_dump_but_still_terminates_the_stream() {
    let provider = orders_provider(1..6);
    provider.fail_after(2);
    let mut dumper = InventoryDumper::new(orders_config(None, None), provider.clone())
        .await
        .unwrap();
    let handle = dumper.handle();

    let (channel, rx) = create_record_channel(CHANNEL_CAPACITY);
    dumper.set_channel(channel);

    let result = dumper.start().await;
    assert!(matches!(
        result,
        Err(DumpError::Source(SourceError::DataAccess(_)))
    ));
    assert_eq!(handle.state(), DumperState::Stopped);
    drop(dumper);

    // The rows read before the failure are delivered, followed by the unconditional
    // end-of-stream marker. No clean finished marker is pushed.
    let records = collect_records(rx).await;
    assert_eq!(records.len(), 3);
    assert!(matches!(records[0], Record::Data(_)));
    assert!(matches!(records[1], Record::Data(_)));
    assert_eq!(records[2], Record::Finished(FinishedRecord::placeholder()));
}

#[tokio::test]
async fn stop_request_cuts_the_scan_short_without_a_clean_marker() {
    let provider = orders_provider(1..6);
    let mut dumper = InventoryDumper::new(orders_config(None, None), provider.clone())
        .await
        .unwrap();
    let handle = dumper.handle();
    provider.stop_after(2, handle.clone());

    let (channel, rx) = create_record_channel(CHANNEL_CAPACITY);
    dumper.set_channel(channel);
    dumper.start().await.unwrap();
    drop(dumper);

    assert_eq!(handle.state(), DumperState::Stopped);

    let records = collect_records(rx).await;
    assert_eq!(records.len(), 3);
    assert!(matches!(records[0], Record::Data(_)));
    assert!(matches!(records[1], Record::Data(_)));
    assert_eq!(records[2], Record::Finished(FinishedRecord::placeholder()));
}

#[tokio::test]
async fn stop_landing_on_the_last_row_suppresses_the_clean_marker() {
    let provider = orders_provider(1..6);
    let mut dumper = InventoryDumper::new(orders_config(None, None), provider.clone())
        .await
        .unwrap();
    let handle = dumper.handle();
    provider.stop_after(5, handle.clone());

    let (channel, rx) = create_record_channel(CHANNEL_CAPACITY);
    dumper.set_channel(channel);
    dumper.start().await.unwrap();
    drop(dumper);

    // every row was read, but the stop was observed before the end of the stream,
    // so only the unconditional marker follows the data
    assert_eq!(handle.state(), DumperState::Stopped);

    let records = collect_records(rx).await;
    assert_eq!(records.len(), 6);
    assert!(records[..5]
        .iter()
        .all(|record| matches!(record, Record::Data(_))));
    assert_eq!(records[5], Record::Finished(FinishedRecord::placeholder()));
}

#[tokio::test]
async fn stop_before_start_skips_the_dump_entirely() {
    let provider = orders_provider(1..6);
    let mut dumper = InventoryDumper::new(orders_config(None, None), provider.clone())
        .await
        .unwrap();
    let handle = dumper.handle();

    let (channel, rx) = create_record_channel(CHANNEL_CAPACITY);
    dumper.set_channel(channel);

    handle.stop();
    dumper.start().await.unwrap();
    drop(dumper);

    assert_eq!(handle.state(), DumperState::Stopped);
    assert!(provider.executed_queries().is_empty());
    assert!(collect_records(rx).await.is_empty());
}

#[tokio::test]
async fn sharded_data_source_is_rejected_at_construction() {
    let provider = orders_provider(1..6);
    let config = DumperConfig {
        data_source: sharded_data_source(),
        table_name: test_table_name("orders"),
        table_name_map: HashMap::new(),
        primary_key: None,
        position: None,
    };

    let result = InventoryDumper::new(config, provider.clone()).await;
    assert!(matches!(
        result,
        Err(DumperBuildError::UnsupportedDataSource(
            DataSourceKind::Sharded
        ))
    ));
    assert!(provider.executed_queries().is_empty());

    // The provider refuses such configurations as well, in case a caller reaches it
    // without going through the dumper.
    let session = provider.get_data_source(&sharded_data_source()).await;
    assert!(matches!(
        session,
        Err(SourceError::UnsupportedDataSource(DataSourceKind::Sharded))
    ));
}

#[tokio::test]
async fn primary_key_without_position_is_rejected_at_construction() {
    let provider = orders_provider(1..6);

    let result = InventoryDumper::new(orders_config(Some("id"), None), provider).await;
    assert!(matches!(result, Err(DumperBuildError::MissingPosition)));
}

#[tokio::test]
async fn missing_table_fails_construction() {
    let provider = orders_provider(1..6);
    provider.missing_table();

    let result = InventoryDumper::new(orders_config(None, None), provider).await;
    assert!(matches!(
        result,
        Err(DumperBuildError::Source(SourceError::MissingTable(_)))
    ));
}

#[tokio::test]
async fn start_runs_the_dump_only_once() {
    let provider = orders_provider(1..6);
    let mut dumper = InventoryDumper::new(orders_config(None, None), provider.clone())
        .await
        .unwrap();

    let (channel, rx) = create_record_channel(CHANNEL_CAPACITY);
    dumper.set_channel(channel);
    dumper.start().await.unwrap();
    dumper.start().await.unwrap();
    drop(dumper);

    assert_eq!(provider.executed_queries().len(), 1);
    assert_eq!(collect_records(rx).await.len(), 7);
}

#[tokio::test]
async fn records_carry_the_mapped_logical_table_name() {
    let table_schema = TableSchema::new(
        1,
        test_table_name("orders_0"),
        vec![int8_column("id", true)],
    );
    let provider = TestSourceProvider::new(table_schema, vec![vec![Cell::I64(1)]]);

    let config = DumperConfig {
        data_source: standard_data_source(),
        table_name: test_table_name("orders_0"),
        table_name_map: HashMap::from([("orders_0".to_string(), "orders".to_string())]),
        primary_key: None,
        position: None,
    };
    let mut dumper = InventoryDumper::new(config, provider).await.unwrap();

    let (channel, rx) = create_record_channel(CHANNEL_CAPACITY);
    dumper.set_channel(channel);
    dumper.start().await.unwrap();
    drop(dumper);

    let records = collect_records(rx).await;
    assert_eq!(data_record(&records[0]).table_name, "orders");
}

#[tokio::test]
async fn start_without_a_channel_fails_and_stops_the_dumper() {
    let provider = orders_provider(1..6);
    let mut dumper = InventoryDumper::new(orders_config(None, None), provider)
        .await
        .unwrap();
    let handle = dumper.handle();

    let result = dumper.start().await;
    assert!(matches!(result, Err(DumpError::MissingChannel)));
    assert_eq!(handle.state(), DumperState::Stopped);
}
