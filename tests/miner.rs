use super::*;

fn settings(pool: &TestPool) -> Settings {
    Settings {
        pool_host: Some("127.0.0.1".into()),
        pool_port: Some(pool.port()),
        address: Some(ADDRESS.into()),
        workers: Some(1),
        hash_engine: Some(EngineChoice::Software),
        once: true,
        ..Default::default()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn submits_first_share_and_stops() {
    let mut pool = TestPool::spawn(EASY_DIFFICULTY).await;

    let miner = Miner::new(&settings(&pool)).unwrap();

    let stats = timeout(Duration::from_secs(60), miner.run(CancellationToken::new()))
        .await
        .unwrap()
        .unwrap();

    pretty_assert_eq!(
        pool.next_submit().await,
        json!([ADDRESS, "bf", "00000000", "504e86b9", "000071bf"])
    );

    assert_eq!(stats.shares, 1);
    assert_eq!(stats.valids, 0);
    assert_eq!(stats.hashes, 0x71c0);
    assert_eq!(stats.rejected, 0);
    assert!(stats.accepted <= 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn external_cancel_stops_workers() {
    // Difficulty 1 shares are far beyond what the test hashes before cancelling.
    let pool = TestPool::spawn(1.0).await;

    let miner = Arc::new(
        Miner::new(&Settings {
            once: false,
            ..settings(&pool)
        })
        .unwrap(),
    );

    let cancel = CancellationToken::new();

    let run = tokio::spawn({
        let miner = miner.clone();
        let cancel = cancel.clone();
        async move { miner.run(cancel).await }
    });

    timeout(Duration::from_secs(30), async {
        while miner.current_job_id().is_none() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(miner.current_job_id().unwrap().as_str(), "bf");
    assert!(miner.status().starts_with("Mining job bf"), "{}", miner.status());

    cancel.cancel();

    let stats: Stats = timeout(Duration::from_secs(30), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_eq!(stats.shares, 0);
}
