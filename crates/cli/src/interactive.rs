use anyhow::{Context, Result};
use extract::{AiResponseData, AnalysisTask, Analyzer, GeminiClient, ModelError};
use ingest::{DocumentLoader, LoadError, LoadedDocument};
use session::{AppConfig, AppState, LoadToken, PreferenceStore, SubmissionTicket, ThemeMode};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use visualize::{AdjacencyMatrix, ChartType, render_text};

const HELP: &str = "Commands:
  file <path>        load a .txt, .md, .pdf or .docx file
  url <url>          load a web page or plain-text URL
  paste              enter document text, end with a line containing only '.'
  task <slug>        facts, query, summarize, web or themes
  query [text]       set the query (empty clears it)
  run                submit the analysis
  show               print the results panel
  charts             list chart types for the current result
  chart <slug>       select bar, line, pie, doughnut, map or matrix
  hover [theme]      highlight a theme in the relationship map
  report <path>      write an HTML report
  log                print recent submissions
  clear              clear the log
  model <name>       save the model name
  theme <mode>       save light, dark or system
  settings           print saved preferences
  status             print document, task and query
  quit";

/// Completion of a spawned load or analysis
enum Event {
    Loaded(LoadToken, Result<LoadedDocument, LoadError>),
    Analyzed(SubmissionTicket, Result<AiResponseData, ModelError>),
}

enum Flow {
    Continue,
    Quit,
}

struct Session {
    state: AppState,
    store: PreferenceStore,
    loader: Arc<DocumentLoader>,
    analyzer: Arc<Analyzer<GeminiClient>>,
    events: mpsc::UnboundedSender<Event>,
    paste: Option<String>,
    hovered: Option<String>,
}

pub async fn run(config: &AppConfig) -> Result<()> {
    let store = PreferenceStore::load(config.resolved_preferences_path());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = Session {
        state: AppState::new(config.log.capacity, store.preferences().clone()),
        store,
        loader: Arc::new(crate::build_loader(config)),
        analyzer: Arc::new(crate::build_analyzer(config)),
        events: tx,
        paste: None,
        hovered: None,
    };

    println!("{}", HELP);
    println!("Task: {}", session.state.task().label());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read from stdin")? else {
                    break;
                };
                if let Flow::Quit = session.handle_line(&line)? {
                    break;
                }
            }
            Some(event) = rx.recv() => session.apply(event),
        }
    }

    tracing::info!(submissions = session.state.log().len(), "Interactive session closed");
    Ok(())
}

impl Session {
    fn handle_line(&mut self, line: &str) -> Result<Flow> {
        if let Some(buffer) = self.paste.as_mut() {
            if line.trim() == "." {
                let text = self.paste.take().unwrap_or_default();
                println!("Document set from pasted text ({} chars).", text.chars().count());
                self.state.set_document_text(text);
            } else {
                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(line);
            }
            return Ok(Flow::Continue);
        }

        let line = line.trim();
        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (line, ""),
        };

        match command {
            "" => {}
            "help" | "?" => println!("{}", HELP),
            "quit" | "exit" => return Ok(Flow::Quit),
            "file" => self.load_file(arg),
            "url" => self.load_url(arg),
            "paste" => {
                println!("Paste document text; finish with a line containing only '.'");
                self.paste = Some(String::new());
            }
            "task" => match AnalysisTask::from_slug(arg) {
                Some(task) => {
                    self.state.select_task(task);
                    println!("Task: {}\n{}", task.label(), task.description());
                }
                None => println!("Unknown task '{}'.", arg),
            },
            "query" => self.state.set_query(arg),
            "run" => self.submit(),
            "show" => println!("{}", render_text(&self.state.panel())),
            "charts" => self.print_charts(),
            "chart" => self.select_chart(arg),
            "hover" => {
                self.hovered = (!arg.is_empty()).then(|| arg.to_string());
            }
            "report" => self.write_report(arg),
            "log" => println!("{}", self.state.log().to_text()),
            "clear" => {
                self.state.log_mut().clear();
                println!("Log cleared.");
            }
            "model" => {
                match self.store.set_model(arg) {
                    Ok(()) => println!("Model: {}", self.store.preferences().model),
                    Err(e) => println!("{}", e),
                }
                self.state.set_preferences(self.store.preferences().clone());
            }
            "theme" => match ThemeMode::parse(arg) {
                Some(theme) => {
                    if let Err(e) = self.store.set_theme(theme) {
                        println!("{}", e);
                    }
                    self.state.set_preferences(self.store.preferences().clone());
                    crate::print_settings(&self.store);
                }
                None => println!("Unknown theme '{}'.", arg),
            },
            "settings" => crate::print_settings(&self.store),
            "status" => self.print_status(),
            other => println!("Unknown command '{}'. Type 'help'.", other),
        }
        Ok(Flow::Continue)
    }

    fn load_file(&mut self, arg: &str) {
        if arg.is_empty() {
            self.state.no_file_selected();
            self.print_document_status();
            return;
        }

        let token = self.state.begin_document_load();
        let loader = Arc::clone(&self.loader);
        let events = self.events.clone();
        let path = PathBuf::from(arg);
        tokio::spawn(async move {
            let result = loader.load_file(&path).await;
            let _ = events.send(Event::Loaded(token, result));
        });
        println!("Loading {}...", arg);
    }

    fn load_url(&mut self, arg: &str) {
        let token = self.state.begin_document_load();
        let loader = Arc::clone(&self.loader);
        let events = self.events.clone();
        let url = arg.to_string();
        tokio::spawn(async move {
            let result = loader.load_url(&url).await;
            let _ = events.send(Event::Loaded(token, result));
        });
        println!("Fetching {}...", arg);
    }

    fn submit(&mut self) {
        let ticket = match self.state.begin_submission() {
            Ok(ticket) => ticket,
            Err(e) => {
                println!("{}", e);
                return;
            }
        };

        let analyzer = Arc::clone(&self.analyzer);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = ticket.run(&*analyzer).await;
            let _ = events.send(Event::Analyzed(ticket, result));
        });
        println!("{}", render_text(&self.state.panel()));
    }

    fn apply(&mut self, event: Event) {
        match event {
            Event::Loaded(token, result) => {
                if self.state.complete_document_load(token, result) {
                    self.print_document_status();
                }
            }
            Event::Analyzed(ticket, result) => match self.state.complete_submission(&ticket, result) {
                Ok(_) => println!("{}", render_text(&self.state.panel())),
                Err(e) => tracing::warn!(error = %e, "Dropped analysis result"),
            },
        }
    }

    fn print_charts(&self) {
        let Some(availability) = self.state.chart_availability() else {
            println!("No result to chart yet.");
            return;
        };
        if !availability.any() {
            println!("No chartable data in this result.");
            return;
        }
        for (chart, enabled) in availability.options() {
            let selected = if chart == self.state.chart() { "*" } else { " " };
            let note = if enabled { "" } else { " (unavailable)" };
            println!("{} {:9} {}{}", selected, chart.slug(), chart.option_label(), note);
        }
    }

    fn select_chart(&mut self, arg: &str) {
        let Some(chart) = ChartType::from_slug(arg) else {
            println!("Unknown chart '{}'.", arg);
            return;
        };
        if let Err(e) = self.state.select_chart(chart) {
            println!("{}", e);
            return;
        }
        println!("Chart: {}", chart.option_label());

        if chart == ChartType::AdjacencyMatrix {
            if let Some(data) = self.state.response() {
                let matrix = AdjacencyMatrix::build(
                    data.facts(),
                    data.relationships(),
                    self.store.preferences().theme.resolve(),
                );
                println!("{}", matrix.to_text());
            }
        }
    }

    fn write_report(&self, arg: &str) {
        if arg.is_empty() {
            println!("Usage: report <path>");
            return;
        }
        let path = PathBuf::from(arg);
        match crate::write_report(&self.state, self.store.preferences().theme, self.hovered.clone(), &path) {
            Ok(()) => println!("Report written to {}", path.display()),
            Err(e) => println!("{:#}", e),
        }
    }

    fn print_document_status(&self) {
        if let Some(status) = self.state.document_status() {
            let prefix = if status.is_error { "! " } else { "" };
            println!("{}{}", prefix, status.message);
        }
    }

    fn print_status(&self) {
        let document = self.state.document_text();
        let loading = if self.state.is_document_loading() { " (loading)" } else { "" };
        println!("Document: {} chars{}", document.chars().count(), loading);
        self.print_document_status();
        println!("Task: {}", self.state.task().label());
        let query = self.state.query();
        println!("Query: {}", if query.is_empty() { "(none)" } else { query });
        if self.state.is_submitting() {
            println!("Analysis running...");
        }
    }
}
