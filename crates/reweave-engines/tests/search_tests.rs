use reweave_core::{Dataset, Executor, FitManager, SearchDirection, VariableSpec};
use reweave_engines::*;
use std::sync::{Arc, Mutex};

fn spec(abbrev: &str) -> VariableSpec {
    VariableSpec {
        name: abbrev.to_uppercase(),
        abbrev: abbrev.to_string(),
        cardinality: 2,
        dependent: false,
        labels: None,
    }
}

/// Four binary variables with real pairwise structure (a-c, b-d, c-d
/// associations) and a sample size in the hundreds.
fn four_var_dataset() -> Dataset {
    let counts = [
        110.0, 15.0, 72.0, 30.0, 24.0, 80.0, 18.0, 96.0, 70.0, 12.0, 105.0, 45.0, 16.0, 68.0,
        22.0, 225.0,
    ];
    let rows: Vec<Vec<usize>> = (0..16)
        .map(|cell| (0..4).map(|bit| (cell >> (3 - bit)) & 1).collect())
        .collect();
    Dataset {
        name: "pairwise".into(),
        variables: vec![spec("a"), spec("b"), spec("c"), spec("d")],
        rows,
        counts: counts.to_vec(),
    }
}

fn manager() -> FitManager {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    FitManager::from_dataset(&four_var_dataset()).unwrap()
}

fn run_search(executor: Executor, statistic: SearchStatistic) -> SearchReport {
    let mut engine = SearchEngine::builder()
        .manager(manager())
        .filter(SearchFilter::Loopless)
        .statistic(statistic)
        .direction(SearchDirection::Ascending)
        .width(3)
        .levels(3)
        .executor(executor)
        .build()
        .unwrap();
    engine.run().unwrap()
}

/// Parallel and sequential searches see the same candidates and produce
/// the same final ordering.
#[test]
fn parallel_matches_sequential() {
    let sequential = run_search(Executor::serial(), SearchStatistic::Bic);
    let parallel = run_search(Executor::worker_pool(4), SearchStatistic::Bic);

    let seq_names: Vec<&str> = sequential.candidates.iter().map(|c| c.name.as_str()).collect();
    let par_names: Vec<&str> = parallel.candidates.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(seq_names, par_names);
    assert_eq!(sequential.total_evaluated, parallel.total_evaluated);

    for (s, p) in sequential.candidates.iter().zip(&parallel.candidates) {
        assert!((s.score - p.score).abs() < 1e-12);
    }
}

#[test]
fn candidates_are_unique_by_name() {
    let report = run_search(Executor::serial(), SearchStatistic::Aic);
    let mut names: Vec<&str> = report.candidates.iter().map(|c| c.name.as_str()).collect();
    let before = names.len();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), before);
}

#[test]
fn report_is_sorted_best_first() {
    for statistic in [SearchStatistic::Aic, SearchStatistic::Bic, SearchStatistic::Ddf] {
        let report = run_search(Executor::serial(), statistic);
        assert!(!report.candidates.is_empty());
        for window in report.candidates.windows(2) {
            assert!(
                statistic.compare(window[0].score, window[1].score)
                    != std::cmp::Ordering::Greater
            );
        }
    }
}

#[test]
fn ascent_improves_on_the_bottom_model() {
    let report = run_search(Executor::serial(), SearchStatistic::Bic);
    let bottom_candidate = report
        .candidates
        .iter()
        .find(|c| c.level == 0)
        .expect("start model is in the global list");
    let best = report.best().unwrap();
    // the data has real pairwise structure, so some association must beat
    // independence on BIC
    assert!(best.score <= bottom_candidate.score);
    assert!(best.name != bottom_candidate.name);
}

#[test]
fn progress_events_are_ordered() {
    let collector = Arc::new(Mutex::new(CollectingHandler::default()));
    let mut engine = SearchEngine::builder()
        .manager(manager())
        .filter(SearchFilter::Loopless)
        .statistic(SearchStatistic::Bic)
        .direction(SearchDirection::Ascending)
        .width(2)
        .levels(2)
        .sequential()
        .progress(ProgressConfig {
            enabled: true,
            model_batch_size: 1,
            ipf_interval: 1,
        })
        .subscribe(collector.clone())
        .build()
        .unwrap();
    engine.run().unwrap();

    let events = &collector.lock().unwrap().events;
    assert!(!events.is_empty());
    assert!(matches!(
        events.first().unwrap().kind,
        SearchEventKind::SearchStarted { .. }
    ));
    assert!(matches!(
        events.last().unwrap().kind,
        SearchEventKind::SearchComplete { .. }
    ));

    // timestamps are monotone
    for window in events.windows(2) {
        assert!(window[0].at <= window[1].at);
    }

    // level events arrive in order and the best never worsens
    let mut last_level = 0;
    let mut last_best = f64::INFINITY;
    for event in events {
        if let SearchEventKind::SearchLevel {
            level, best_stat, ..
        } = &event.kind
        {
            assert!(*level > last_level);
            last_level = *level;
            assert!(*best_stat <= last_best);
            last_best = *best_stat;
        }
    }
    assert!(last_level > 0);
}

#[test]
fn model_batch_counters_accumulate() {
    let collector = Arc::new(Mutex::new(CollectingHandler::default()));
    let mut engine = SearchEngine::builder()
        .manager(manager())
        .filter(SearchFilter::Loopless)
        .statistic(SearchStatistic::Aic)
        .width(3)
        .levels(2)
        .sequential()
        .progress(ProgressConfig {
            enabled: true,
            model_batch_size: 2,
            ipf_interval: 50,
        })
        .subscribe(collector.clone())
        .build()
        .unwrap();
    engine.run().unwrap();

    let events = &collector.lock().unwrap().events;
    let mut last_total = 0;
    for event in events {
        if let SearchEventKind::ModelBatch {
            evaluated,
            in_level,
            total_evaluated,
        } = &event.kind
        {
            assert!(*evaluated >= 2);
            assert!(*in_level >= *evaluated);
            assert!(*total_evaluated >= last_total);
            last_total = *total_evaluated;
        }
    }
}

/// The chain filter enumerates the whole chain family once; a second
/// level adds nothing and the search stops early.
#[test]
fn chain_search_exhausts_in_one_level() {
    let mut engine = SearchEngine::builder()
        .manager(manager())
        .filter(SearchFilter::Chain)
        .statistic(SearchStatistic::Bic)
        .width(5)
        .levels(4)
        .sequential()
        .build()
        .unwrap();
    let report = engine.run().unwrap();

    // 4!/2 chains plus the independence start model
    assert_eq!(report.candidates.len(), 13);
    assert!(report.levels_run <= 2);
}

#[test]
fn start_model_notation_is_honored() {
    let mut engine = SearchEngine::builder()
        .manager(manager())
        .filter(SearchFilter::Loopless)
        .statistic(SearchStatistic::Bic)
        .direction(SearchDirection::Descending)
        .start_model("ab:cd")
        .width(2)
        .levels(1)
        .sequential()
        .build()
        .unwrap();
    let report = engine.run().unwrap();
    assert!(report.candidates.iter().any(|c| c.name == "ab:cd"));
}

#[test]
fn builder_rejects_zero_width() {
    let result = SearchEngine::builder().manager(manager()).width(0).build();
    assert!(result.is_err());
}

/// Directed ascent grows the predictive relation one IV at a time, and
/// every candidate keeps predicting the dependent variable.
#[test]
fn directed_search_grows_the_predictive_relation() {
    let mut variables = vec![spec("a"), spec("b"), spec("c")];
    variables.push(VariableSpec {
        name: "Z".into(),
        abbrev: "z".into(),
        cardinality: 2,
        dependent: true,
        labels: None,
    });
    let dataset = Dataset {
        variables,
        ..four_var_dataset()
    };

    let mut engine = SearchEngine::builder()
        .dataset(&dataset)
        .unwrap()
        .filter(SearchFilter::Loopless)
        .statistic(SearchStatistic::Aic)
        .direction(SearchDirection::Ascending)
        .width(2)
        .levels(3)
        .sequential()
        .build()
        .unwrap();
    let report = engine.run().unwrap();

    // the bottom reference abc:z seeds the search
    assert!(report.candidates.iter().any(|c| c.name == "abc:z"));
    // every non-seed candidate pairs z with at least one IV
    for candidate in report.candidates.iter().filter(|c| c.level > 0) {
        let relation_with_z = candidate
            .name
            .split(':')
            .find(|rel| rel.contains('z'))
            .unwrap();
        assert!(relation_with_z.len() >= 2, "{}", candidate.name);
    }
    // level 1 adds exactly the three single-IV predictive relations
    let level_one: Vec<&str> = report
        .candidates
        .iter()
        .filter(|c| c.level == 1)
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(level_one.len(), 3);
    for name in ["abc:az", "abc:bz", "abc:cz"] {
        assert!(level_one.contains(&name), "missing {name}");
    }
}
