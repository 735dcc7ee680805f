use dotenvy::dotenv;
use std::env;

use mergington::client::{EnrollmentClient, HttpRosterApi, RosterApi};
use mergington::models::RosterSnapshot;

const USAGE: &str = "usage: enroll list | enroll signup <activity> <email> | enroll unregister <activity> <email>";

#[tokio::main]
async fn main() {
    dotenv().ok();
    mergington::init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let api = HttpRosterApi::from_env();
    let base_url = api.base_url().to_string();
    let mut client = EnrollmentClient::new(api);

    let code = match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["list"] => match client.refresh().await {
            Ok(snapshot) => {
                print_roster(snapshot);
                0
            }
            Err(e) => {
                eprintln!("could not load activities from {}: {}", base_url, e);
                1
            }
        },
        ["signup", activity, email] => {
            let outcome = client.request_signup(activity, email).await;
            report(&client, &outcome)
        }
        ["unregister", activity, email] => {
            let outcome = client.request_unregister(activity, email).await;
            report(&client, &outcome)
        }
        _ => {
            eprintln!("{}", USAGE);
            2
        }
    };

    std::process::exit(code);
}

fn report<A: RosterApi>(
    client: &EnrollmentClient<A>,
    outcome: &mergington::client::EnrollmentOutcome,
) -> i32 {
    if !outcome.is_success() {
        eprintln!("❌ {}", outcome.message);
        return 1;
    }

    println!("✅ {}", outcome.message);
    match (&outcome.refresh_error, client.cached()) {
        (Some(e), _) => eprintln!("(roster not refreshed: {})", e),
        (None, Some(snapshot)) => print_roster(snapshot),
        (None, None) => {}
    }
    0
}

fn print_roster(snapshot: &RosterSnapshot) {
    for (name, activity) in snapshot {
        println!();
        println!("{}  ({} spots left)", name, activity.spots_left());
        println!("  {}", activity.description);
        println!("  {}", activity.schedule);
        if activity.participants.is_empty() {
            println!("  no participants yet");
        }
        for p in &activity.participants {
            println!("  - {}", p);
        }
    }
}
