use chrono::{NaiveDate, Weekday};
use crash_course::{
    PlannerConfig, StudyCalendarConfig, Syllabus, SyllabusError, load_planner_config,
    load_syllabus_from_csv, load_syllabus_from_json, save_plan_to_json, save_syllabus_to_csv,
    save_syllabus_to_json,
};
use polars::prelude::{AnyValue, DataFrame};
use std::fs;
use std::io::{self, Write};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn parse_id_list(s: &str) -> Result<Vec<i32>, String> {
    s.split([',', ';'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<i32>().map_err(|_| p.to_string()))
        .collect()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn cell_text(col_name: &str, av: &AnyValue<'_>) -> String {
    match av {
        AnyValue::Null => String::new(),
        AnyValue::Int32(v) => v.to_string(),
        AnyValue::Int64(v) => v.to_string(),
        AnyValue::Float64(v) if col_name == "priority_score" => format!("{v:.4}"),
        AnyValue::Float64(v) => v.to_string(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::List(inner) if col_name == "prerequisites" => {
            if let Ok(ca) = inner.i32() {
                ca.into_iter()
                    .flatten()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(";")
            } else {
                av.to_string()
            }
        }
        _ => av.to_string(),
    }
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

    let cells: Vec<Vec<String>> = (0..df.height())
        .map(|row_idx| {
            columns
                .iter()
                .map(|col| {
                    col.get(row_idx)
                        .map(|av| cell_text(col.name(), &av))
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.len()).collect();
    for row in &cells {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.len());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let render_row = |values: &[String]| {
        let mut line = String::from("|");
        for (i, value) in values.iter().enumerate() {
            line.push(' ');
            line.push_str(value);
            line.push_str(&" ".repeat(widths[i].saturating_sub(value.len())));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&col_names));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &cells {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  show                               Show topics\n  add <id> <name> <freq> <marks> [last_year]\n                                     Upsert a topic with its PYQ signals\n  delete <id>                        Delete a topic and drop it from prerequisites\n  prereq <id> <ids>                  Set prerequisites (e.g. 1;2 or 1,2)\n  source <id> <document>             Set the source document of a topic\n  meta show                          Show exam metadata\n  meta name <text...>                Update exam name\n  meta desc <text...>                Update exam description\n  meta dates <start> <exam>          Update start and exam dates (YYYY-MM-DD)\n  meta days <n>                      Number of crash-course study days\n  calendar show                      Show the study calendar\n  calendar days <Mon,Tue,...>        Set study weekdays\n  calendar minutes <n>               Set default daily study minutes\n  calendar blackout <YYYY-MM-DD>     Exclude a date\n  calendar capacity <YYYY-MM-DD> <n> Override the minutes of one date\n  calendar set <json_path>           Load calendar config from JSON file\n  calendar save <json_path>          Save calendar config to JSON file\n  config show                        Show planner config\n  config load <json_path>            Load planner config from JSON file\n  config weights <freq> <marks> <recency>\n                                     Set weightage signal weights\n  config min <minutes>               Minimum minutes per scheduled topic\n  config max <minutes|none>          Maximum minutes per topic\n  config slot <minutes>              Allocation granularity\n  refresh                            Recompute topic priorities\n  plan                               Generate the crash-course schedule\n  export plan <path>                 Write the last plan as JSON\n  save <json|csv> <path>             Persist syllabus to disk\n  load <json|csv> <path>             Load syllabus from disk\n  quit|exit                          Exit"
    );
}

fn print_metadata(syllabus: &Syllabus) {
    let metadata = syllabus.metadata();
    println!("Exam name          : {}", metadata.exam_name);
    println!("Exam description   : {}", metadata.exam_description);
    println!("Start date         : {}", metadata.start_date);
    println!("Exam date          : {}", metadata.exam_date);
    println!("Study days         : {}", metadata.study_days);
}

fn print_calendar_info(syllabus: &Syllabus) {
    let config = syllabus.calendar_config();
    let study_days = config
        .study_days()
        .iter()
        .map(|wd| wd.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let blackout = config
        .blackout_dates()
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let dates = syllabus
        .study_dates()
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    println!("Study weekdays     : {}", study_days);
    println!("Daily minutes      : {}", config.daily_minutes());
    println!("Blackout dates     : {}", blackout);
    for (date, minutes) in config.capacity_overrides() {
        println!("Capacity override  : {} = {} min", date, minutes);
    }
    println!("Plan dates         : {}", dates);
}

fn print_config(config: &PlannerConfig) {
    match serde_json::to_string_pretty(config) {
        Ok(json) => println!("{}", json),
        Err(e) => println!("Error serializing config: {}", e),
    }
}

fn report_metadata_update(result: Result<(), SyllabusError>, syllabus: &Syllabus) {
    match result {
        Ok(()) => {
            println!("Metadata updated.");
            print_metadata(syllabus);
        }
        Err(SyllabusError::StartNotBeforeExam { .. }) => {
            println!("Start date must be before the exam date.");
        }
        Err(SyllabusError::ZeroStudyDays) => {
            println!("A crash course needs at least one study day.");
        }
        Err(SyllabusError::StudyDaysExceedWindow { window, .. }) => {
            println!("Only {} day(s) fit before the exam date.", window);
        }
        Err(e) => println!("Metadata update error: {}", e),
    }
}

fn update_calendar<F>(syllabus: &mut Syllabus, mutate: F)
where
    F: FnOnce(&mut crash_course::StudyCalendar) -> Result<(), crash_course::CalendarError>,
{
    let mut calendar = syllabus.calendar().clone();
    match mutate(&mut calendar) {
        Ok(()) => {
            syllabus.set_calendar(calendar);
            println!("Calendar updated.");
            print_calendar_info(syllabus);
        }
        Err(e) => println!("Calendar error: {}", e),
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    let mut syllabus = Syllabus::new();
    let mut config = PlannerConfig::default();
    let mut last_plan = None;

    println!("Crash-Course Planner (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "show" => println!("{}", render_df_as_text_table(syllabus.dataframe())),
            "add" => {
                let args: Vec<&str> = parts.collect();
                if args.len() < 4 {
                    println!("Usage: add <id> <name> <freq> <marks> [last_year]");
                    continue;
                }
                let Ok(id) = args[0].parse::<i32>() else {
                    println!("Invalid id");
                    continue;
                };
                let Ok(frequency) = args[2].parse::<i64>() else {
                    println!("Invalid frequency");
                    continue;
                };
                let Ok(marks) = args[3].parse::<f64>() else {
                    println!("Invalid marks");
                    continue;
                };
                let last_year = match args.get(4).map(|s| s.parse::<i32>()) {
                    None => None,
                    Some(Ok(year)) => Some(year),
                    Some(Err(_)) => {
                        println!("Invalid year");
                        continue;
                    }
                };
                match syllabus.upsert_topic(id, args[1], frequency, marks, last_year) {
                    Ok(()) => {
                        println!("Topic upserted.");
                        println!("{}", render_df_as_text_table(syllabus.dataframe()));
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "delete" => match parts.next().map(|s| s.parse::<i32>()) {
                Some(Ok(id)) => match syllabus.delete_topic(id) {
                    Ok(true) => {
                        println!("Deleted topic {id}.");
                        println!("{}", render_df_as_text_table(syllabus.dataframe()));
                    }
                    Ok(false) => println!("Topic {id} not found."),
                    Err(e) => println!("Error deleting topic: {}", e),
                },
                Some(Err(_)) => println!("Invalid id"),
                None => println!("Usage: delete <id>"),
            },
            "prereq" => {
                let id_s = parts.next();
                let list = parts.next().unwrap_or("");
                match (id_s.map(|s| s.parse::<i32>()), parse_id_list(list)) {
                    (Some(Ok(id)), Ok(ids)) => match syllabus.set_prerequisites(id, ids) {
                        Ok(()) => {
                            println!("Prerequisites set.");
                            println!("{}", render_df_as_text_table(syllabus.dataframe()));
                        }
                        Err(e) => println!("Error: {}", e),
                    },
                    (Some(Ok(_)), Err(bad)) => println!("Invalid prerequisite id '{}'", bad),
                    (Some(Err(_)), _) => println!("Invalid id"),
                    (None, _) => println!("Usage: prereq <id> <ids>"),
                }
            }
            "source" => {
                let id_s = parts.next();
                let rest: Vec<&str> = parts.collect();
                match (id_s.map(|s| s.parse::<i32>()), rest.is_empty()) {
                    (Some(Ok(id)), false) => {
                        let result = syllabus.find_topic(id).map_err(SyllabusError::from).and_then(
                            |found| {
                                let mut topic = found.ok_or(SyllabusError::TopicNotFound(id))?;
                                topic.source_document = Some(rest.join(" "));
                                syllabus.upsert_topic_record(topic)
                            },
                        );
                        match result {
                            Ok(()) => println!("Source document set."),
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    (Some(Err(_)), _) => println!("Invalid id"),
                    _ => println!("Usage: source <id> <document>"),
                }
            }
            "meta" => match parts.next() {
                Some("show") | None => print_metadata(&syllabus),
                Some("name") => {
                    let rest: Vec<&str> = parts.collect();
                    if rest.is_empty() {
                        println!("Usage: meta name <text...>");
                        continue;
                    }
                    syllabus.set_exam_name(rest.join(" "));
                    println!("Exam name updated.");
                    print_metadata(&syllabus);
                }
                Some("desc") => {
                    let rest: Vec<&str> = parts.collect();
                    if rest.is_empty() {
                        println!("Usage: meta desc <text...>");
                        continue;
                    }
                    syllabus.set_exam_description(rest.join(" "));
                    println!("Exam description updated.");
                    print_metadata(&syllabus);
                }
                Some("dates") => match (
                    parts.next().map(parse_date),
                    parts.next().map(parse_date),
                ) {
                    (Some(Some(start)), Some(Some(exam))) => {
                        let result = syllabus.set_dates(start, exam);
                        report_metadata_update(result, &syllabus);
                    }
                    (Some(_), Some(_)) => println!("Invalid date (YYYY-MM-DD)"),
                    _ => println!("Usage: meta dates <YYYY-MM-DD> <YYYY-MM-DD>"),
                },
                Some("days") => match parts.next().map(|s| s.parse::<u32>()) {
                    Some(Ok(days)) => {
                        let result = syllabus.set_study_days(days);
                        report_metadata_update(result, &syllabus);
                    }
                    _ => println!("Usage: meta days <n>"),
                },
                Some(other) => {
                    println!("Unknown meta command '{}'.", other);
                    println!("Usage: meta show|name|desc|dates|days ...");
                }
            },
            "calendar" => match parts.next() {
                Some("show") | None => print_calendar_info(&syllabus),
                Some("days") => {
                    let days: Result<Vec<Weekday>, _> = parts
                        .next()
                        .unwrap_or("")
                        .split(',')
                        .filter(|s| !s.trim().is_empty())
                        .map(|s| s.trim().parse::<Weekday>())
                        .collect();
                    match days {
                        Ok(days) => update_calendar(&mut syllabus, |c| c.set_study_days(days)),
                        Err(_) => println!("Invalid weekday list (e.g. Mon,Tue,Wed)"),
                    }
                }
                Some("minutes") => match parts.next().map(|s| s.parse::<u32>()) {
                    Some(Ok(minutes)) => {
                        update_calendar(&mut syllabus, |c| c.set_daily_minutes(minutes))
                    }
                    _ => println!("Usage: calendar minutes <n>"),
                },
                Some("blackout") => match parts.next().and_then(parse_date) {
                    Some(date) => update_calendar(&mut syllabus, |c| {
                        c.add_blackout_date(date);
                        Ok(())
                    }),
                    None => println!("Usage: calendar blackout <YYYY-MM-DD>"),
                },
                Some("capacity") => match (
                    parts.next().and_then(parse_date),
                    parts.next().map(|s| s.parse::<u32>()),
                ) {
                    (Some(date), Some(Ok(minutes))) => {
                        update_calendar(&mut syllabus, |c| c.set_capacity(date, minutes))
                    }
                    _ => println!("Usage: calendar capacity <YYYY-MM-DD> <minutes>"),
                },
                Some("set") => match parts.next() {
                    Some(path) => match fs::read_to_string(path) {
                        Ok(contents) => match serde_json::from_str::<StudyCalendarConfig>(&contents)
                        {
                            Ok(calendar) => match syllabus.set_calendar_from_config(&calendar) {
                                Ok(()) => {
                                    println!("Calendar updated from {}.", path);
                                    print_calendar_info(&syllabus);
                                }
                                Err(e) => println!("Error applying calendar: {}", e),
                            },
                            Err(e) => println!("Invalid calendar JSON: {}", e),
                        },
                        Err(e) => println!("Error reading {}: {}", path, e),
                    },
                    None => println!("Usage: calendar set <json_path>"),
                },
                Some("save") => match parts.next() {
                    Some(path) => match serde_json::to_string_pretty(&syllabus.calendar_config()) {
                        Ok(json) => match fs::write(path, json) {
                            Ok(()) => println!("Calendar saved to {}.", path),
                            Err(e) => println!("Error writing {}: {}", path, e),
                        },
                        Err(e) => println!("Error serializing calendar: {}", e),
                    },
                    None => println!("Usage: calendar save <json_path>"),
                },
                Some(other) => {
                    println!("Unknown calendar command '{}'.", other);
                    println!(
                        "Usage: calendar show|days|minutes|blackout|capacity|set <json_path>|save <json_path>"
                    );
                }
            },
            "config" => {
                let mut candidate = config.clone();
                match parts.next() {
                    Some("show") | None => {
                        print_config(&config);
                        continue;
                    }
                    Some("load") => match parts.next() {
                        Some(path) => match load_planner_config(path) {
                            Ok(loaded) => candidate = loaded,
                            Err(e) => {
                                println!("Error loading config: {}", e);
                                continue;
                            }
                        },
                        None => {
                            println!("Usage: config load <json_path>");
                            continue;
                        }
                    },
                    Some("weights") => {
                        let weights: Vec<f64> =
                            parts.filter_map(|s| s.parse::<f64>().ok()).collect();
                        if weights.len() != 3 {
                            println!("Usage: config weights <freq> <marks> <recency>");
                            continue;
                        }
                        candidate.weightage.frequency_weight = weights[0];
                        candidate.weightage.marks_weight = weights[1];
                        candidate.weightage.recency_weight = weights[2];
                    }
                    Some("min") => match parts.next().map(|s| s.parse::<u32>()) {
                        Some(Ok(minutes)) => candidate.allocation.min_minutes_per_topic = minutes,
                        _ => {
                            println!("Usage: config min <minutes>");
                            continue;
                        }
                    },
                    Some("max") => match parts.next() {
                        Some("none") => candidate.allocation.max_minutes_per_topic = None,
                        Some(s) => match s.parse::<u32>() {
                            Ok(minutes) => {
                                candidate.allocation.max_minutes_per_topic = Some(minutes)
                            }
                            Err(_) => {
                                println!("Usage: config max <minutes|none>");
                                continue;
                            }
                        },
                        None => {
                            println!("Usage: config max <minutes|none>");
                            continue;
                        }
                    },
                    Some("slot") => match parts.next().map(|s| s.parse::<u32>()) {
                        Some(Ok(minutes)) => candidate.allocation.slot_minutes = minutes,
                        _ => {
                            println!("Usage: config slot <minutes>");
                            continue;
                        }
                    },
                    Some(other) => {
                        println!("Unknown config command '{}'.", other);
                        println!("Usage: config show|load|weights|min|max|slot ...");
                        continue;
                    }
                }
                match candidate.validate() {
                    Ok(()) => {
                        config = candidate;
                        println!("Config updated.");
                        print_config(&config);
                    }
                    Err(e) => println!("Config error: {}", e),
                }
            }
            "refresh" => match syllabus.refresh_with(&config.weightage) {
                Ok(summary) => {
                    println!(
                        "Refreshed ({})\n{}",
                        summary.to_cli_summary(),
                        render_df_as_text_table(syllabus.dataframe())
                    );
                }
                Err(e) => println!("Refresh error: {}", e),
            },
            "plan" => match syllabus.generate_plan(&config) {
                Ok(plan) => {
                    println!("Plan generated ({})", plan.summary.to_cli_summary());
                    print!("{}", plan.render_text());
                    last_plan = Some(plan);
                }
                Err(e) => println!("Plan error: {}", e),
            },
            "export" => match (parts.next(), parts.next()) {
                (Some("plan"), Some(path)) => match &last_plan {
                    Some(plan) => match save_plan_to_json(plan, path) {
                        Ok(()) => println!("Plan exported to {}.", path),
                        Err(e) => println!("Error exporting plan: {}", e),
                    },
                    None => println!("No plan generated yet. Run 'plan' first."),
                },
                _ => println!("Usage: export plan <path>"),
            },
            "save" => {
                let fmt = parts.next();
                let path = parts.next();
                match (fmt, path) {
                    (Some("json"), Some(path)) => match save_syllabus_to_json(&syllabus, path) {
                        Ok(()) => println!("Syllabus saved to {}.", path),
                        Err(e) => println!("Error saving syllabus: {}", e),
                    },
                    (Some("csv"), Some(path)) => match save_syllabus_to_csv(&syllabus, path) {
                        Ok(()) => println!("Syllabus saved to {}.", path),
                        Err(e) => println!("Error saving syllabus: {}", e),
                    },
                    _ => println!("Usage: save <json|csv> <path>"),
                }
            }
            "load" => {
                let fmt = parts.next();
                let path = parts.next();
                let loaded = match (fmt, path) {
                    (Some("json"), Some(path)) => load_syllabus_from_json(path),
                    (Some("csv"), Some(path)) => load_syllabus_from_csv(path),
                    _ => {
                        println!("Usage: load <json|csv> <path>");
                        continue;
                    }
                };
                match loaded {
                    Ok(loaded) => {
                        syllabus = loaded;
                        last_plan = None;
                        println!("Syllabus loaded from {}.", path.unwrap_or_default());
                        println!("{}", render_df_as_text_table(syllabus.dataframe()));
                    }
                    Err(e) => println!("Error loading syllabus: {}", e),
                }
            }
            _ => {
                println!("Unknown command. Type 'help'.");
            }
        }
    }
}
