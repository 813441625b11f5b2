use cardbox_core::db::{DatastoreClient, DbError, PoolSettings, ReadPreference};
use cardbox_core::{Card, CardRepository, QueryBuilder, RequestContext, SqliteCardRepository};
use rusqlite::Connection;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const SLOW_QUERY: &str = "WITH RECURSIVE counter(n) AS (
    SELECT 1
    UNION ALL
    SELECT n + 1 FROM counter WHERE n < 1000000000
)
SELECT COUNT(*) FROM counter;";

fn open_client(dir: &TempDir, settings: PoolSettings) -> DatastoreClient {
    let address = dir.path().join("cards.db");
    DatastoreClient::open(
        address.to_str().unwrap(),
        settings,
        ReadPreference::SecondaryPreferred,
    )
    .unwrap()
}

fn run_slow_query(conn: &Connection) -> Result<i64, DbError> {
    Ok(conn.query_row(SLOW_QUERY, [], |row| row.get(0))?)
}

#[test]
fn cancel_aborts_running_reader_statement() {
    let dir = tempfile::tempdir().unwrap();
    let client = open_client(&dir, PoolSettings::default());
    let ctx = RequestContext::new();
    let handle = ctx.cancel_handle();

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        handle.cancel();
    });
    let started = Instant::now();
    let err = client.with_reader(&ctx, run_slow_query).unwrap_err();
    canceller.join().unwrap();

    assert!(err.is_interrupted());
    assert!(started.elapsed() < Duration::from_secs(10));

    let count = client
        .with_reader(&RequestContext::new(), |conn| {
            Ok::<_, DbError>(conn.query_row("SELECT COUNT(*) FROM cards;", [], |row| {
                row.get::<_, i64>(0)
            })?)
        })
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn deadline_aborts_running_writer_statement() {
    let dir = tempfile::tempdir().unwrap();
    let client = open_client(&dir, PoolSettings::default());

    let started = Instant::now();
    let ctx = RequestContext::new().with_timeout(Duration::from_millis(50));
    let err = client.with_writer(&ctx, run_slow_query).unwrap_err();
    let elapsed = started.elapsed();

    assert!(err.is_interrupted());
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_secs(10));

    client.ping(&RequestContext::new()).unwrap();
}

#[test]
fn interrupted_listing_fails_instead_of_returning_partial_page() {
    let dir = tempfile::tempdir().unwrap();
    let client = open_client(&dir, PoolSettings::default());

    client
        .with_writer(&RequestContext::new(), |conn| {
            let tx = conn.unchecked_transaction()?;
            {
                let repo = SqliteCardRepository::new(&tx);
                for index in 0..2_000 {
                    repo.insert(&Card::new(format!("card-{index:04}"), "", Vec::new()))?;
                }
            }
            tx.commit()?;
            Ok::<_, cardbox_core::RepoError>(())
        })
        .unwrap();

    let query = QueryBuilder::new("listing")
        .order_by(Some("title"))
        .paginate(Some(100), Some(1))
        .build();
    let ctx = RequestContext::new();
    let handle = ctx.cancel_handle();

    let err = client
        .with_reader(&ctx, |conn| {
            handle.cancel();
            SqliteCardRepository::new(conn).find_many(&query)
        })
        .unwrap_err();
    assert!(err.is_interrupted());

    let page = client
        .with_reader(&RequestContext::new(), |conn| {
            SqliteCardRepository::new(conn).find_many(&query)
        })
        .unwrap();
    assert_eq!(page.cards.len(), 100);
    assert_eq!(page.cards[0].title, "card-0000");
}

#[test]
fn idle_readers_are_closed_down_to_minimum() {
    let dir = tempfile::tempdir().unwrap();
    let client = open_client(
        &dir,
        PoolSettings {
            min_size: 1,
            max_size: 4,
            max_idle: Duration::ZERO,
            ..PoolSettings::default()
        },
    );
    let ctx = RequestContext::new();
    assert_eq!(client.open_readers(), 1);

    let peak = client
        .with_reader(&ctx, |_| {
            client.with_reader(&ctx, |_| {
                client.with_reader(&ctx, |_| Ok::<_, DbError>(client.open_readers()))
            })
        })
        .unwrap();
    assert_eq!(peak, 3);
    assert_eq!(client.open_readers(), 3);

    thread::sleep(Duration::from_millis(5));
    client
        .with_reader(&ctx, |_| Ok::<_, DbError>(()))
        .unwrap();
    assert_eq!(client.open_readers(), 1);
}

#[test]
fn exhausted_pool_waits_until_deadline() {
    let dir = tempfile::tempdir().unwrap();
    let client = open_client(
        &dir,
        PoolSettings {
            min_size: 1,
            max_size: 1,
            ..PoolSettings::default()
        },
    );

    let (inner, waited) = client
        .with_reader(&RequestContext::new(), |_| {
            let short = RequestContext::new().with_timeout(Duration::from_millis(50));
            let started = Instant::now();
            let inner = client.with_reader(&short, |_| Ok::<_, DbError>(()));
            Ok::<_, DbError>((inner, started.elapsed()))
        })
        .unwrap();

    assert!(matches!(inner, Err(DbError::DeadlineExceeded)));
    assert!(waited >= Duration::from_millis(40));
    assert_eq!(client.open_readers(), 1);

    client
        .with_reader(&RequestContext::new(), |_| Ok::<_, DbError>(()))
        .unwrap();
}
