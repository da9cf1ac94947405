//! Search a small synthetic survey table for the best BIC model, printing
//! progress as the beam advances.

use reweave::*;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let dataset = survey();
    let mut engine = SearchEngine::builder()
        .dataset(&dataset)?
        .filter(SearchFilter::Loopless)
        .statistic(SearchStatistic::Bic)
        .direction(SearchDirection::Ascending)
        .width(3)
        .levels(5)
        .on_event(|event: &SearchEvent| {
            if let SearchEventKind::SearchLevel {
                level,
                total_evaluated,
                best_name,
                best_stat,
                ..
            } = &event.kind
            {
                println!(
                    "level {level}: {total_evaluated} models, best {best_name} ({best_stat:.3})"
                );
            }
        })
        .build()?;

    let report = engine.run()?;

    println!("\ntop models by BIC:");
    for candidate in report.candidates.iter().take(8) {
        let fit = &candidate.result;
        println!(
            "  {:<14} bic={:>9.3} aic={:>9.3} h={:.4} info={:.3}{}",
            candidate.name,
            fit.bic,
            fit.aic,
            fit.h,
            fit.information,
            if fit.has_loops { "  (loops)" } else { "" },
        );
    }
    println!(
        "\n{} models in {:?}",
        report.total_evaluated, report.elapsed
    );
    Ok(())
}

/// Four binary survey questions with built-in pairwise structure.
fn survey() -> Dataset {
    let variables = ["a", "b", "c", "d"]
        .iter()
        .map(|ab| VariableSpec {
            name: ab.to_uppercase(),
            abbrev: (*ab).to_string(),
            cardinality: 2,
            dependent: false,
            labels: Some(vec!["no".into(), "yes".into()]),
        })
        .collect();

    let counts = [
        110.0, 15.0, 72.0, 30.0, 24.0, 80.0, 18.0, 96.0, 70.0, 12.0, 105.0, 45.0, 16.0, 68.0,
        22.0, 225.0,
    ];
    let rows = (0..16)
        .map(|cell| (0..4).map(|bit| (cell >> (3 - bit)) & 1).collect())
        .collect();

    Dataset {
        name: "survey".into(),
        variables,
        rows,
        counts: counts.to_vec(),
    }
}
