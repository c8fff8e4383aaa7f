use code_judge::{Judge, JudgeConfig, Problem, Submission, TestCase};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("Code Judge Engine v0.1.0");
    println!("========================");

    for (language, binary, found) in Judge::check_environment() {
        let mark = if found { "✓" } else { "✗" };
        println!("  {mark} {language:<11} ({binary})");
    }
    println!();

    let example_code = r#"
#include <stdio.h>

int main() {
    int n;
    scanf("%d", &n);
    printf("%d\n", n * 2);
    return 0;
}
"#;

    let submission = Submission {
        source_code: example_code.to_string(),
        language: "c".to_string(),
        problem_id: "example-1".to_string(),
    };

    let problem = Problem {
        id: "example-1".to_string(),
        points: 100,
        time_limit_ms: Some(1_000),
    };

    let cases = vec![
        TestCase {
            input: "5\n".to_string(),
            expected_output: "10\n".to_string(),
            is_visible: true,
            points: 50,
            order_index: 0,
        },
        TestCase {
            input: "10\n".to_string(),
            expected_output: "20\n".to_string(),
            is_visible: true,
            points: 50,
            order_index: 1,
        },
    ];

    let judge = Judge::new(JudgeConfig::default());
    let result = judge.evaluate(&submission, &cases, &problem).await?;

    println!("Judge Result:");
    println!("=============");
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
