use anyhow::{Context, Result};
use tracing::info;

use crate::tasks::{
    task_1, task_10, task_2, task_3, task_4, task_5, task_6, task_7, task_8, task_9, Task6Mode,
    TaskContext,
};

type Stage = (&'static str, fn(&TaskContext) -> Result<()>);

fn task_6_predict(ctx: &TaskContext) -> Result<()> {
    task_6(ctx, Task6Mode::Predict)
}

fn task_6_evaluate(ctx: &TaskContext) -> Result<()> {
    task_6(ctx, Task6Mode::Evaluate)
}

const STAGES: [Stage; 11] = [
    ("task 1", task_1),
    ("task 2", task_2),
    ("task 3", task_3),
    ("task 4", task_4),
    ("task 5", task_5),
    ("task 6 predict", task_6_predict),
    ("task 6 evaluate", task_6_evaluate),
    ("task 7", task_7),
    ("task 8", task_8),
    ("task 9", task_9),
    ("task 10", task_10),
];

/// Runs tasks 1 through 10 and stops at the first failure.
pub fn run_all(ctx: &TaskContext) -> Result<()> {
    run_stages(ctx, &STAGES)
}

fn run_stages(ctx: &TaskContext, stages: &[Stage]) -> Result<()> {
    for (idx, (name, stage)) in stages.iter().enumerate() {
        info!(stage = name, step = idx + 1, total = stages.len(), "starting");
        stage(ctx).with_context(|| format!("{name} failed"))?;
    }
    info!(outputs = %ctx.outputs.display(), "all tasks finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::testing;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn run_all_with_local_model_writes_every_output() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir_all(&data).unwrap();
        fs::write(
            data.join("christmas.txt"),
            "Families gather around decorated trees. Markets stay open late. Gifts are shared at dawn.",
        )
        .unwrap();
        fs::write(
            data.join("sales.txt"),
            "Electronics deliver the highest profit per customer during Christmas sales at 42 percent.",
        )
        .unwrap();
        let outputs = dir.path().join("outputs");
        let model = testing::local;
        let ctx = TaskContext::new(&outputs, &data, &model);
        run_all(&ctx).unwrap();
        for name in [
            "task_1.txt",
            "task_2.txt",
            "task_3.txt",
            "task_4_groundtruth.json",
            "task_4_groundtruth.txt",
            "task_5_needle_in_haystack.txt",
            "task_5_insights.json",
            "task_6_evaluation_report.json",
            "task_7_chunks.json",
            "task_8_chunks.json",
            "task_8_embeddings.json",
            "task_9_retrieval_results.json",
            "task_10_prediction.json",
            "task_10_evaluation_report.json",
            "task_10.txt",
        ] {
            assert!(outputs.join(name).exists(), "{name} missing");
        }
    }

    #[test]
    fn run_stops_at_first_failure() {
        fn ok(_: &TaskContext) -> Result<()> {
            Ok(())
        }
        fn boom(_: &TaskContext) -> Result<()> {
            Err(anyhow::anyhow!("boom"))
        }
        fn unreachable_stage(ctx: &TaskContext) -> Result<()> {
            fs::write(ctx.output("late.txt"), "ran")?;
            Ok(())
        }
        let dir = tempdir().unwrap();
        let model = testing::local;
        let ctx = TaskContext::new(dir.path(), dir.path(), &model);
        let stages: [Stage; 3] = [("first", ok), ("second", boom), ("third", unreachable_stage)];
        let err = run_stages(&ctx, &stages).unwrap_err();
        assert_eq!(err.to_string(), "second failed");
        assert!(!dir.path().join("late.txt").exists());
    }
}
