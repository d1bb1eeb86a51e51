use anyhow::{Context, Result};
use tracing::info;

use ragbench_core::{load_txt, save_txt};
use ragbench_rag::{generate_insights, passage_prompt, prompt_llm};

use super::{TaskContext, CHRISTMAS_PASSAGE, TASK_1_FILE, TASK_2_FILE, TASK_3_FILE};

const GREETING: &str = "hello world";
const TASK_2_PROMPT: &str =
    "Generate a cool and short message about how AI is transforming the future.";

pub fn task_1(ctx: &TaskContext) -> Result<()> {
    let text = banner(GREETING);
    println!("{text}");
    let path = ctx.output(TASK_1_FILE);
    save_txt(&text, &path)?;
    info!(output = %path.display(), "task 1 finished");
    Ok(())
}

fn banner(message: &str) -> String {
    let width = message.chars().count() + 4;
    let edge = "*".repeat(width + 2);
    let blank = format!("*{}*", " ".repeat(width));
    format!("{edge}\n{blank}\n*  {message}  *\n{blank}\n{edge}\n")
}

pub fn task_2(ctx: &TaskContext) -> Result<()> {
    let response = prompt_llm(ctx.model(), TASK_2_PROMPT)?;
    println!("Model Response:\n{response}");
    let path = ctx.output(TASK_2_FILE);
    save_txt(&response, &path)?;
    info!(output = %path.display(), chars = response.len(), "task 2 finished");
    Ok(())
}

/// Three insights about the Christmas passage, saved as pretty JSON.
pub fn task_3(ctx: &TaskContext) -> Result<()> {
    let passage_path = ctx.data_file(CHRISTMAS_PASSAGE);
    let passage = load_txt(&passage_path)
        .with_context(|| format!("failed to read passage {}", passage_path.display()))?;
    let mut set = generate_insights(ctx.model(), &passage_prompt(passage.trim()))?;
    if set.passage.as_deref().map_or(true, |p| p.trim().is_empty()) {
        set.passage = Some(passage.trim().to_string());
    }
    let mut body = serde_json::to_string_pretty(&set)?;
    body.push('\n');
    let path = ctx.output(TASK_3_FILE);
    save_txt(&body, &path)?;
    info!(output = %path.display(), insights = set.insights.len(), "task 3 finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::testing;
    use ragbench_core::InsightSet;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn task_1_writes_banner() {
        let dir = tempdir().unwrap();
        let model = testing::local;
        let ctx = TaskContext::new(dir.path(), dir.path(), &model);
        task_1(&ctx).unwrap();
        let text = fs::read_to_string(dir.path().join(TASK_1_FILE)).unwrap();
        assert!(text.contains("*  hello world  *"));
        let widths: Vec<usize> = text.lines().map(|l| l.chars().count()).collect();
        assert!(widths.iter().all(|w| *w == widths[0]));
    }

    #[test]
    fn task_2_saves_model_reply() {
        let dir = tempdir().unwrap();
        let model = testing::fixed("AI is rewriting tomorrow.");
        let ctx = TaskContext::new(dir.path(), dir.path(), &model);
        task_2(&ctx).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join(TASK_2_FILE)).unwrap(),
            "AI is rewriting tomorrow."
        );
    }

    #[test]
    fn task_3_fills_missing_passage() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir_all(&data).unwrap();
        fs::write(
            data.join(CHRISTMAS_PASSAGE),
            "Families decorate trees. Markets glow at night. Gifts are exchanged at dawn.",
        )
        .unwrap();
        let model = testing::local;
        let ctx = TaskContext::new(dir.path().join("outputs"), &data, &model);
        task_3(&ctx).unwrap();
        let saved: InsightSet = serde_json::from_str(
            &fs::read_to_string(dir.path().join("outputs").join(TASK_3_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(saved.insights.len(), 3);
        assert!(saved.passage.unwrap().starts_with("Families decorate trees."));
    }

    #[test]
    fn task_3_fails_on_prose_reply_without_writing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CHRISTMAS_PASSAGE), "Snow fell.").unwrap();
        let model = testing::fixed("I could not find any insights.");
        let ctx = TaskContext::new(dir.path().join("outputs"), dir.path(), &model);
        let err = task_3(&ctx).unwrap_err();
        assert!(err.to_string().contains("parseable JSON"));
        assert!(!dir.path().join("outputs").join(TASK_3_FILE).exists());
    }

    #[test]
    fn task_3_requires_passage_file() {
        let dir = tempdir().unwrap();
        let model = testing::local;
        let ctx = TaskContext::new(dir.path(), dir.path(), &model);
        assert!(task_3(&ctx).is_err());
    }
}
