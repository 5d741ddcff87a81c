use colored::Colorize;

use reasoning_booster::config::ReasoningConfig;
use reasoning_booster::sampler::{BudgetedSampler, OllamaSampler};
use reasoning_booster::session::Session;
use reasoning_booster::verifier::RuleVerifier;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let task = if args.is_empty() {
        "Weigh 12 coins to find the counterfeit".to_string()
    } else {
        args.join(" ")
    };

    let config = ReasoningConfig::default();
    let verifier = RuleVerifier::new(&config);
    let mut session = Session::new(&task, config.clone());

    // A live backend is optional; without OLLAMA_MODEL the run is heuristic-only.
    let mut sampler = std::env::var("OLLAMA_MODEL")
        .ok()
        .map(|model| BudgetedSampler::new(OllamaSampler::new(&model), config.llm_max_calls));

    println!("{} {}", "task:".bold(), task);
    let outcome = match sampler.as_mut() {
        Some(s) => session.run(&verifier, 8, Some(s)),
        None => session.run_heuristic(&verifier, 8),
    };
    if let Err(err) = outcome {
        eprintln!("{} {}", "error:".red().bold(), err);
        return;
    }

    for record in &session.history {
        println!(
            "{} {} {}",
            "step".cyan(),
            format!("{:.3}", record.chosen.score.total_score).yellow(),
            record.chosen.proposal.text
        );
    }

    println!("\n{}", session.summarize().green());
    println!("\n{}", session.trace.render().dimmed());

    let diagnostics = sampler.map(|s| s.diagnostics.clone());
    println!("\n{}", session.payload(diagnostics.as_ref()));
}
