use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::{Duration, sleep};

use legate_core::cache::ToolCallCache;
use legate_core::domain::{AgentError, ResponseField, TaskSpec, Tool};
use legate_core::exec::Coordinator;
use legate_core::exec::pool::WorkerPool;
use legate_core::ports::Agent;
use legate_core::typed::Structured;

#[derive(Debug, Serialize, Deserialize)]
struct Forecast {
    city: String,
    outlook: String,
}

impl Structured for Forecast {
    const NAME: &'static str = "forecast";
}

/// Demo agent: "looks up" the weather for the city in the task description,
/// memoizing lookups through the shared tool-call cache.
struct WeatherAgent {
    cache: ToolCallCache,
}

#[async_trait]
impl Agent for WeatherAgent {
    fn role(&self) -> &str {
        "weather-researcher"
    }

    async fn execute(
        &self,
        spec: &TaskSpec,
        _context: Option<&str>,
        _tools: &[Tool],
    ) -> Result<String, AgentError> {
        let city = spec.description.rsplit(' ').next().unwrap_or("somewhere");
        let tool = Tool::new("search");

        let outlook = match self.cache.read(&tool, city).await {
            Some(cached) => cached,
            None => {
                // pretend this is an expensive lookup
                sleep(Duration::from_millis(100)).await;
                let fresh = "sunny".to_string();
                self.cache.add(tool, city, fresh.clone()).await;
                fresh
            }
        };

        Ok(serde_json::json!({"city": city, "outlook": outlook}).to_string())
    }
}

fn weather_spec(city: &str) -> TaskSpec {
    TaskSpec::builder()
        .description(format!("report the weather in {city}"))
        .output_fields(vec![
            ResponseField::new("city", "str", true),
            ResponseField::new("outlook", "str", true),
        ])
        .callback(|output| println!("callback fired: {output}"))
        .build()
        .expect("valid spec")
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cache = ToolCallCache::new();
    let agent = Arc::new(WeatherAgent {
        cache: cache.clone(),
    });
    let coordinator = Coordinator::new();

    // (A) synchronous execution in this task
    let mut spec = weather_spec("paris");
    println!("prompt:\n{}\n", spec.prompt(None, None));
    let output = coordinator
        .execute_sync(&mut spec, agent.as_ref(), None, None)
        .await
        .expect("sync execution");
    println!("sync output: {output}");
    println!("processed by: {:?}\n", spec.processed_by_agents());

    // (B) asynchronous execution; the handle is the only blocking point
    let handle = coordinator.execute_async(weather_spec("paris"), agent.clone(), None, None);
    println!("async execution dispatched, doing other work...");
    let completed = handle.wait().await.expect("async execution");
    println!("async output: {}\n", completed.output);

    // (C) typed output: the agent's JSON constructs a Forecast
    let typed_spec = TaskSpec::builder()
        .description("report the weather in tokyo")
        .expect_json(false)
        .structured::<Forecast>()
        .build()
        .expect("valid spec");
    let handle = coordinator.execute_async(typed_spec, agent.clone(), None, None);
    let completed = handle.wait().await.expect("typed execution");
    match completed.output.structured_as::<Forecast>() {
        Some(forecast) => println!("typed output: {forecast:?}\n"),
        None => println!("typed output downgraded: {:?}\n", completed.output.json_dict()),
    }

    // (D) pooled execution; the paris lookup is now served from the cache
    let pool = WorkerPool::spawn(2, 16, coordinator.clone());
    let handle = pool.submit(weather_spec("paris"), agent, None, None).await;
    let completed = handle.wait().await.expect("pooled execution");
    println!("pooled output: {}", completed.output);
    println!("cache counts: {:?}", cache.counts().await);

    pool.shutdown_and_join().await;
}
