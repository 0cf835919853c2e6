use ansi_term::Colour::{Cyan, Green, Yellow};
use chrono::{Duration, Local};

use crate::tracking::{
    session::{ClosedSession, RunningSession},
    timestamp::Instant,
    tree::Frame,
};

const TIME_FORMAT: &str = "%x %H:%M:%S";

pub fn print_started(running: &RunningSession) {
    println!(
        "Starting {} at {}",
        Cyan.paint(running.project.as_str()),
        format_time(running.start)
    );
}

pub fn print_stopped(closed: &ClosedSession) {
    println!(
        "Stopping {}, started at {} ({})",
        Cyan.paint(closed.project.as_str()),
        format_time(closed.start),
        format_duration(closed.stop - closed.start)
    );
}

pub fn print_cancelled(running: &RunningSession) {
    println!(
        "Cancelling {}, started at {}",
        Cyan.paint(running.project.as_str()),
        format_time(running.start)
    );
}

pub fn print_status(current: Option<&RunningSession>, now: Instant) {
    match current {
        Some(running) => println!(
            "Project {} started at {} ({})",
            Cyan.paint(running.project.as_str()),
            format_time(running.start),
            format_duration(now - running.start)
        ),
        None => println!("No project started"),
    }
}

pub fn print_projects(projects: &[String]) {
    for project in projects {
        println!("{}", Cyan.paint(project.as_str()));
    }
}

pub fn print_frames(frames: &[Frame]) {
    for frame in frames {
        let id = frame
            .id
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{}\t{}\t{}\t{}\t{}{}",
            Yellow.paint(id),
            format_time(frame.start),
            format_time(frame.stop),
            format_duration(frame.stop - frame.start),
            Cyan.paint(frame.project.as_str()),
            frame
                .message
                .as_ref()
                .map(|v| format!("\t{v}"))
                .unwrap_or_default()
        );
    }
}

pub fn print_synced(created: &[Frame]) {
    if created.is_empty() {
        println!("Nothing new to push");
        return;
    }
    for frame in created {
        println!(
            "{} {} {}",
            Green.paint("Pushed"),
            Cyan.paint(frame.project.as_str()),
            format_time(frame.start)
        );
    }
}

fn format_time(instant: Instant) -> String {
    instant.with_timezone(&Local).format(TIME_FORMAT).to_string()
}

pub fn format_duration(v: Duration) -> String {
    if v.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}
