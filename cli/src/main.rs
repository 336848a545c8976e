use std::io::{self, BufRead, Write};

use clap::Parser;
use env_logger::Env;
use mathbot::{
    catalog, check_length, evaluate, format, glossary, interpret, Category, Config,
    DispatchOutcome, InputError, Report, Value,
};

/// Solves math typed in plain text.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Expressions to evaluate; starts a session when empty
    exprs: Vec<String>,

    /// Longest accepted input in characters
    #[arg(long)]
    max_input: Option<usize>,

    /// Time budget per expression in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Print replies as the chat bot sends them
    #[arg(long)]
    markdown: bool,
}

#[derive(Default)]
struct Context {
    /// Last plain result, substituted for `ans`.
    ans: Option<String>,
}

impl Context {
    fn expand(&self, input: &str) -> String {
        match &self.ans {
            Some(ans) => replace_word(input, "ans", &format!("({ans})")),
            None => input.to_owned(),
        }
    }

    /// Checks the line as typed against the input limit, then substitutes
    /// `ans`. A long previous result never makes a short line too long.
    fn prepare(&self, input: &str, config: &Config) -> Result<String, InputError> {
        check_length(input, config)?;
        Ok(self.expand(input))
    }

    fn update_ans(&mut self, report: &Report) {
        if let DispatchOutcome::Success {
            value: Value::Expr(expr),
            ..
        } = &report.outcome
        {
            self.ans = Some(expr.to_string());
        }
    }
}

fn replace_word(text: &str, word: &str, with: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (i, _) in text.match_indices(word) {
        let before = text[..i].chars().last().map_or(false, is_word);
        let after = text[i + word.len()..].chars().next().map_or(false, is_word);
        if !before && !after {
            out.push_str(&text[last..i]);
            out.push_str(with);
            last = i + word.len();
        }
    }
    out.push_str(&text[last..]);
    out
}

fn print_report(input: &str, config: &Config, markdown: bool, ctx: &mut Context) {
    if markdown {
        println!("{}", interpret(input, config));
        return;
    }
    match evaluate(input, config) {
        Ok(report) => {
            match &report.outcome {
                DispatchOutcome::Success {
                    rendered, numeric, ..
                } => {
                    println!("= {rendered}");
                    if let Some(numeric) = numeric {
                        println!("≈ {numeric}");
                    }
                }
                DispatchOutcome::Failure {
                    message,
                    expression,
                    kind,
                } => eprintln!("{kind} `{expression}`: {message}"),
            }
            ctx.update_ans(&report);
        }
        Err(err) => eprintln!("{err}"),
    }
}

fn print_examples() {
    for category in Category::ALL {
        println!("{}", category.title());
        for example in catalog().iter().filter(|e| e.category == category) {
            println!("  {:<32} {}", example.expression, example.description);
        }
    }
}

fn print_symbols() {
    for entry in glossary() {
        println!("  {:<10} -> {:<10} {}", entry.pattern, entry.canonical, entry.description);
    }
}

fn config(args: &Args) -> Config {
    let mut config = Config::from_env().unwrap_or_else(|err| {
        log::warn!("{err}, using defaults");
        Config::default()
    });
    if let Some(max) = args.max_input {
        config.max_input_chars = max;
    }
    if let Some(ms) = args.timeout_ms {
        config.timeout = std::time::Duration::from_millis(ms);
    }
    config
}

fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    let config = config(&args);
    let mut ctx = Context::default();

    if !args.exprs.is_empty() {
        for e in &args.exprs {
            println!("{e}");
            print_report(e, &config, args.markdown, &mut ctx);
        }
        return;
    }

    // lines are checked before `ans` is substituted
    let expanded = Config {
        max_input_chars: usize::MAX,
        ..config.clone()
    };
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        let Some(Ok(line)) = lines.next() else {
            break;
        };
        let input = line.trim();
        match input {
            "" => continue,
            "quit" | "exit" => break,
            "examples" => print_examples(),
            "symbols" => print_symbols(),
            "help" => println!("{}", format::USAGE_HINT),
            _ => match ctx.prepare(input, &config) {
                Ok(input) => print_report(&input, &expanded, args.markdown, &mut ctx),
                Err(err) if args.markdown => println!("{}", format::input_error(&err)),
                Err(err) => eprintln!("{err}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ans_is_replaced_as_a_word() {
        let ctx = Context {
            ans: Some(String::from("2*x")),
        };
        assert_eq!(ctx.expand("ans + 1"), "(2*x) + 1");
        assert_eq!(ctx.expand("answer"), "answer");
        assert_eq!(Context::default().expand("ans"), "ans");
    }

    #[test]
    fn limit_applies_to_the_typed_line() {
        let config = Config {
            max_input_chars: 10,
            ..Config::default()
        };
        let ctx = Context {
            ans: Some("1".repeat(40)),
        };
        let line = ctx.prepare("ans + 1", &config).unwrap();
        assert_eq!(line, format!("({}) + 1", "1".repeat(40)));
        assert!(matches!(
            ctx.prepare("1+1+1+1+1+1", &config),
            Err(InputError::TooLong { length: 11, limit: 10 })
        ));
    }
}
