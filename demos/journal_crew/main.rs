//! # Journal Crew
//!
//! Builds a retrieval index over a small slice of the Qualis catalog, then
//! runs a two-task crew: a researcher searches the catalog for journals on a
//! topic, and an advisor turns the findings into a recommendation, checking
//! publication volume on Crossref when it can.
//!
//! Uses Ollama when `OLLAMA_MODEL` is set (and `OLLAMA_HOST` if the server
//! is not on localhost). Without it, a scripted model runs the same crew
//! offline.
//!
//! Run: `cargo run -p sucupira-demos --bin journal_crew -- "saúde pública"`

use std::sync::Arc;

use serde_json::json;
use sucupira_core::{GenerateConfig, Llm};
use sucupira_crew::{Agent, Crew, CrewError, Inputs, Task};
use sucupira_model::{MockLlm, MockStep, OllamaConfig, OllamaModel};
use sucupira_rag::{
    EngineConfig, HashingEmbeddingProvider, JournalSearchTool, Record, RetrievalEngine,
};
use sucupira_tool::CrossrefJournalTool;

// ---------------------------------------------------------------------------
// Sample catalog rows as exported from Sucupira
// ---------------------------------------------------------------------------

fn catalog() -> Vec<Record> {
    [
        ("Revista de Saúde Pública", "Saúde Coletiva", "0034-8910", "A1"),
        ("Cadernos de Saúde Pública", "Saúde Coletiva", "0102-311X", "A1"),
        ("Ciência & Saúde Coletiva", "Saúde Coletiva", "1413-8123", "A2"),
        ("Revista Brasileira de Epidemiologia", "Saúde Coletiva", "1415-790X", "A2"),
        ("Revista Brasileira de Informática na Educação", "Ciência da Computação", "1414-5685", "A3"),
        ("Journal of the Brazilian Computer Society", "Ciência da Computação", "0104-6500", "A2"),
        ("Revista de Administração Contemporânea", "Administração Pública e de Empresas", "1415-6555", "A2"),
        ("Estudos Avançados", "Interdisciplinar", "0103-4014", "A1"),
    ]
    .into_iter()
    .map(|(title, area, issn, stratum)| {
        Record::new()
            .with("Título", title)
            .with("Área de Avaliação", area)
            .with("ISSN", issn)
            .with("Estrato", stratum)
    })
    .collect()
}

// ---------------------------------------------------------------------------
// Model selection
// ---------------------------------------------------------------------------

fn model(topic: &str) -> anyhow::Result<Arc<dyn Llm>> {
    if std::env::var("OLLAMA_MODEL").is_ok() {
        let config = OllamaConfig::from_env()?;
        println!("Using Ollama model '{}' at {}", config.model, config.host);
        return Ok(Arc::new(OllamaModel::new(config)?));
    }

    println!("OLLAMA_MODEL not set, using a scripted model (offline).");
    Ok(Arc::new(MockLlm::new([
        MockStep::call_tool("journal_search", json!({ "query": topic, "k": 3 })),
        MockStep::RespondWithObservations,
        MockStep::respond(format!(
            "For '{topic}', prefer the A1 journals listed above; the search ranks them first."
        )),
    ])))
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sucupira_telemetry::init_telemetry("journal-crew");

    let topic = std::env::args().nth(1).unwrap_or_else(|| "saúde pública".to_string());

    // -- 1. Build the index and persist it --------------------------------
    let embedder = Arc::new(HashingEmbeddingProvider::default());
    let builder = RetrievalEngine::new(EngineConfig::default(), embedder.clone());
    let report = builder.rebuild(&catalog()).await?;
    println!("Indexed {} journals ({} dropped)", report.indexed, report.dropped);

    let snapshot = std::env::temp_dir().join("sucupira_index.json");
    builder.persist(&snapshot).await?;

    // -- 2. Reopen it the way a long-running service would ------------------
    let engine = Arc::new(RetrievalEngine::open(EngineConfig::default(), embedder, &snapshot).await?);
    for hit in engine.hits(&topic, 2).await? {
        println!("  {:.4}  {}", hit.score, hit.snippet);
    }

    // -- 3. Agents and tasks -------------------------------------------------
    let llm = model(&topic)?;
    let researcher = Arc::new(
        Agent::builder("Journal Researcher")
            .goal("Find the best-rated journals on a topic in the Qualis catalog")
            .backstory("You have spent years helping Brazilian graduate students choose venues.")
            .llm(llm.clone())
            .tool(Arc::new(JournalSearchTool::new(engine)))
            .config(GenerateConfig::new().with_temperature(0.2))
            .build()?,
    );
    let advisor = Arc::new(
        Agent::builder("Publication Advisor")
            .goal("Recommend where to submit a paper")
            .backstory("You weigh Qualis strata against how much each journal publishes.")
            .llm(llm)
            .tool(Arc::new(CrossrefJournalTool::new()?))
            .build()?,
    );

    let crew = Crew::builder()
        .task(
            Task::builder("search")
                .description("Search the catalog for journals about {topic}.")
                .expected_output("Each journal's title, ISSN, evaluation area and stratum")
                .agent(researcher)
                .build()?,
        )
        .task(
            Task::builder("recommend")
                .description("Recommend the best venue for a paper about {topic}.")
                .expected_output("A short recommendation naming one journal and why")
                .agent(advisor)
                .context(["search"])
                .build()?,
        )
        .build()?;

    // -- 4. Run ---------------------------------------------------------------
    let inputs = Inputs::from([("topic".to_string(), topic)]);
    match crew.kickoff(&inputs).await {
        Ok(output) => {
            for task in &output.tasks_output {
                println!("\n=== {} ({}) ===\n{}", task.name, task.agent, task.raw);
            }
            println!("\nRun {} finished: {:?}", output.report.run_id, output.report.status);
        }
        Err(CrewError::TaskFailure { task, source, report, .. }) => {
            eprintln!("Task '{task}' failed: {source}");
            for record in &report.tasks {
                eprintln!("  {:<10} {:?}", record.name, record.state);
            }
            anyhow::bail!("run {} failed", report.run_id);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
