use std::{io, str::FromStr};

use chrono::{Datelike, Local, NaiveTime, Weekday};
use colored::Colorize;

use classhours_utils::{
    hours_service::{HoursService, HoursServiceError},
    report::{day_schedule, report_by_section, SectionFilter},
    roster::{SlotId, StudentId, TeacherId},
    slot::SlotState,
};

#[repr(u8)]
pub enum MainProgramOptions {
    AddTeacher = b'0',
    AddStudent = b'1',
    AddSlot = b'2',
    SetSlotState = b'3',
    ShowLedger = b'4',
    SectionReport = b'5',
    TodaySchedule = b'6',
    SetTeacherQuota = b'7',
    Invalid,
}

impl MainProgramOptions {
    pub fn from(c: char) -> MainProgramOptions {
        match c {
            '0' => Self::AddTeacher,
            '1' => Self::AddStudent,
            '2' => Self::AddSlot,
            '3' => Self::SetSlotState,
            '4' => Self::ShowLedger,
            '5' => Self::SectionReport,
            '6' => Self::TodaySchedule,
            '7' => Self::SetTeacherQuota,
            _ => Self::Invalid,
        }
    }
}

fn main() {
    let mut service = prologue();
    let today = Local::now().date_naive();

    loop {
        println!("##############################################################");
        println!("\t{}", "ClassHours Terminal Version:".cyan().bold());
        println!("0. Add teacher");
        println!("1. Add student");
        println!("2. Schedule slot");
        println!("3. Mark slot done / not done");
        println!("4. Show slot ledger");
        println!("5. Hours report by section");
        println!("6. Today's schedule for a level");
        println!("7. Set teacher quota");
        println!("##############################################################");

        let mut buffer = String::new();
        io::stdin().read_line(&mut buffer).unwrap();

        match buffer.chars().next() {
            Some(current_char) => match MainProgramOptions::from(current_char) {
                MainProgramOptions::AddTeacher => {
                    let name = read_line("Teacher name:");
                    let quota: f64 = read_parsed("Weekly quota hours:");
                    match service.add_teacher(name, quota) {
                        Ok(id) => println!("Teacher registered under id {}.", id),
                        Err(err) => panic_epilogue(&service, err),
                    }
                    break;
                }
                MainProgramOptions::AddStudent => {
                    let name = read_line("Student name:");
                    let level: u8 = read_parsed("Level (3-6):");
                    let group = read_line("Class group (empty for none):");
                    let group = if group.is_empty() { None } else { Some(group) };
                    match service.add_student(name, level, group) {
                        Ok(id) => println!("Student registered under id {}.", id),
                        Err(err) => panic_epilogue(&service, err),
                    }
                    break;
                }
                MainProgramOptions::AddSlot => {
                    let teacher = TeacherId(read_parsed("Teacher id:"));
                    let student = StudentId(read_parsed("Student id:"));
                    let weekday = read_weekday();
                    let start = read_time("Start time (HH:MM):");
                    let end = read_time("End time (HH:MM):");
                    match service.create_slot(teacher, student, weekday, start, end, today) {
                        Ok(id) => println!("Slot scheduled under id {}.", id),
                        Err(err) => panic_epilogue(&service, err),
                    }
                    break;
                }
                MainProgramOptions::SetSlotState => {
                    let slot = SlotId(read_parsed("Slot id:"));
                    let done = read_line("New state (d = done, n = not done):");
                    let new_state = match done.chars().next() {
                        Some('d') => SlotState::Done,
                        _ => SlotState::NotDone,
                    };
                    match service.set_slot_state(slot, new_state, today) {
                        Ok(ledger) => println!(
                            "Ledger for slot {}: due {:.2} h, done {:.2} h, overtime {:.2} h.",
                            slot,
                            ledger.hours_due(),
                            ledger.hours_done(),
                            ledger.hours_overtime()
                        ),
                        Err(err) => panic_epilogue(&service, err),
                    }
                    break;
                }
                MainProgramOptions::ShowLedger => {
                    let slot = SlotId(read_parsed("Slot id:"));
                    match service.get_ledger(slot) {
                        Ok(ledger) => {
                            println!(
                                "Ledger for slot {}: due {:.2} h, done {:.2} h, overtime {:.2} h.",
                                slot,
                                ledger.hours_due(),
                                ledger.hours_done(),
                                ledger.hours_overtime()
                            );
                            if let Some(changed) = ledger.last_change() {
                                println!("Last change: {}.", changed);
                            }
                        }
                        Err(err) => panic_epilogue(&service, err),
                    }
                    break;
                }
                MainProgramOptions::SectionReport => {
                    let raw = read_line("Section level (number, anything else for all):");
                    let report = report_by_section(&service, SectionFilter::parse(&raw));
                    if report.rows.is_empty() {
                        println!("{}", "No ledgers recorded yet.".yellow());
                    }
                    for row in &report.rows {
                        println!(
                            "Level {} class {}: {} class(es), due {:.2} h, done {:.2} h, overtime {:.2} h, ratio {:.2} %.",
                            row.level,
                            row.group.as_deref().unwrap_or("-"),
                            row.class_count,
                            row.hours_due,
                            row.hours_done,
                            row.hours_overtime,
                            row.ratio
                        );
                    }
                    for totals in &report.level_totals {
                        println!(
                            "{}",
                            format!(
                                "Level {} totals: due {:.2} h, done {:.2} h, overtime {:.2} h.",
                                totals.level,
                                totals.hours_due,
                                totals.hours_done,
                                totals.hours_overtime
                            )
                            .bold()
                        );
                    }
                    break;
                }
                MainProgramOptions::TodaySchedule => {
                    let level: u8 = read_parsed("Level (3-6):");
                    // "Today" is resolved here, once, at the boundary.
                    let weekday = Local::now().weekday();
                    let rows = day_schedule(&service, level, weekday);
                    if rows.is_empty() {
                        println!("{}", "No slots scheduled today for this level.".yellow());
                    }
                    for row in rows {
                        println!(
                            "Slot {}: {} with {} from {} to {}, {:?}, done {:.2} h of {:.2} h ({:.2} %).",
                            row.slot,
                            row.teacher_name,
                            row.student_name,
                            row.start.format("%H:%M"),
                            row.end.format("%H:%M"),
                            row.state,
                            row.hours_done,
                            row.hours_due,
                            row.ratio
                        );
                    }
                    break;
                }
                MainProgramOptions::SetTeacherQuota => {
                    let teacher = TeacherId(read_parsed("Teacher id:"));
                    let quota: f64 = read_parsed("New weekly quota hours:");
                    match service.set_teacher_quota(teacher, quota) {
                        Ok(()) => println!("Quota updated."),
                        Err(err) => panic_epilogue(&service, err),
                    }
                    break;
                }
                MainProgramOptions::Invalid => continue,
            },
            None => continue,
        }
    }

    epilogue(&service);
}

fn read_line(prompt: &str) -> String {
    println!("{}", prompt);
    let mut buffer = String::new();
    io::stdin().read_line(&mut buffer).unwrap();
    buffer.trim().to_string()
}

fn read_parsed<T: FromStr>(prompt: &str) -> T {
    loop {
        match read_line(prompt).parse() {
            Ok(value) => return value,
            Err(_) => println!("{}", "Could not read that value, try again.".red()),
        }
    }
}

fn read_time(prompt: &str) -> NaiveTime {
    loop {
        match NaiveTime::parse_from_str(&read_line(prompt), "%H:%M") {
            Ok(time) => return time,
            Err(_) => println!("{}", "Expected HH:MM, try again.".red()),
        }
    }
}

fn read_weekday() -> Weekday {
    loop {
        match Weekday::from_str(&read_line("Weekday (e.g. monday):")) {
            Ok(weekday) => return weekday,
            Err(_) => println!("{}", "Unknown weekday, try again.".red()),
        }
    }
}

fn panic_epilogue(service: &HoursService, err: HoursServiceError) {
    epilogue(service);
    panic!("Error occurred: {}", err)
}

fn prologue() -> HoursService {
    match HoursService::read_state() {
        Ok(saved_service) => saved_service,
        Err(service_error) => match service_error {
            HoursServiceError::SerializationError => HoursService::new(),
            HoursServiceError::RegistryOpenError => {
                panic!("Error at registry opening!");
            }
            err => panic!("Impossible to happen: {}", err),
        },
    }
}

fn epilogue(current_service: &HoursService) {
    match current_service.save_state() {
        Ok(()) => (),
        Err(service_error) => match service_error {
            HoursServiceError::SerializationError => panic!("Error at serialization!"),
            HoursServiceError::RegistryOpenError => {
                panic!("Error at registry opening!");
            }
            err => panic!("Impossible to happen: {}", err),
        },
    }
}
