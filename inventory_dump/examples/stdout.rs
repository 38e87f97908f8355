use std::collections::HashMap;
use std::error::Error;

use clap::{Args, Parser};
use inventory_dump::channel::create_record_channel;
use inventory_dump::config::{DataSourceConfig, DumperConfig};
use inventory_dump::dumper::InventoryDumper;
use inventory_dump::position::PrimaryKeyPosition;
use inventory_dump::record::Record;
use inventory_dump::sources::postgres::PostgresSourceProvider;
use postgres::schema::TableName;
use tracing::{error, info};

const CHANNEL_SIZE: usize = 32;

#[derive(Debug, Parser)]
#[command(name = "stdout", version, about, arg_required_else_help = true)]
struct AppArgs {
    #[clap(flatten)]
    db_args: DbArgs,

    #[clap(flatten)]
    table_args: TableArgs,
}

#[derive(Debug, Args)]
struct DbArgs {
    /// Host on which Postgres is running
    #[arg(long)]
    db_host: String,

    /// Port on which Postgres is running
    #[arg(long)]
    db_port: u16,

    /// Postgres database name
    #[arg(long)]
    db_name: String,

    /// Postgres database user name
    #[arg(long)]
    db_username: String,

    /// Postgres database user password
    #[arg(long)]
    db_password: Option<String>,
}

#[derive(Debug, Args)]
struct TableArgs {
    /// Schema of the table to dump
    #[arg(long, default_value = "public")]
    schema: String,

    /// Name of the table to dump
    #[arg(long)]
    name: String,

    /// Primary key column bounding the scan
    #[arg(long)]
    primary_key: Option<String>,

    /// First primary key value to dump
    #[arg(long, requires = "primary_key")]
    begin: Option<i64>,

    /// Last primary key value to dump
    #[arg(long, requires = "primary_key")]
    end: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    if let Err(e) = main_impl().await {
        error!("{e}");
    }

    Ok(())
}

async fn main_impl() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let args = AppArgs::parse();
    let db_args = args.db_args;
    let table_args = args.table_args;

    let position = match (table_args.begin, table_args.end) {
        (Some(begin), Some(end)) => Some(PrimaryKeyPosition::new(begin, end)),
        _ => None,
    };

    let config = DumperConfig {
        data_source: DataSourceConfig::Standard {
            host: db_args.db_host,
            port: db_args.db_port,
            name: db_args.db_name,
            username: db_args.db_username,
            password: db_args.db_password,
        },
        table_name: TableName::new(table_args.schema, table_args.name),
        table_name_map: HashMap::new(),
        primary_key: table_args.primary_key,
        position,
    };

    let mut dumper = InventoryDumper::new(config, PostgresSourceProvider::new()).await?;

    let (channel, mut rx) = create_record_channel(CHANNEL_SIZE);
    dumper.set_channel(channel);

    let consumer = tokio::spawn(async move {
        while let Some(record) = rx.recv().await {
            match record {
                Record::Data(record) => info!("record: {record:?}"),
                Record::Finished(record) => info!("finished: {:?}", record.position),
            }
        }
    });

    let dump_result = dumper.start().await;

    // dropping the dumper releases its end of the channel so the consumer drains out
    drop(dumper);
    consumer.await?;
    dump_result?;

    Ok(())
}
