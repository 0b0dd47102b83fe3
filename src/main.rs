use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lms_client::session::open_store;
use lms_client::{ApiError, ApiResult, ClientConfig, LmsClient, SessionManager};

const USAGE: &str = "usage: lms-client <command>
  whoami
  signin <username> <password>
  signout
  signup <username> <password> <firstname> <lastname>
  courses [query]
  assignments <course-code>...";

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "lms_client=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(&args).await {
        error!("{}", e);
        eprintln!("error: {}", e.user_message());
        std::process::exit(1);
    }
}

async fn run(args: &[String]) -> ApiResult<()> {
    let config = ClientConfig::new_from_env()?;
    info!("Using backend at {}", config.base_url);

    let store = open_store(&config.session).await?;
    let client = LmsClient::new(config, store.clone())?;
    let session = SessionManager::new(Arc::new(client.clone()), store);
    session.rehydrate().await?;

    let command = args.first().map(String::as_str).unwrap_or("whoami");
    let rest = args.get(1..).unwrap_or_default();

    match (command, rest) {
        ("whoami", []) => match session.user() {
            Some(user) => println!("{} ({})", user.username, user.full_name()),
            None => println!("not signed in"),
        },
        ("signin", [username, password]) => {
            let user = session.sign_in(username, password).await?;
            println!("signed in as {}", user.username);
        }
        ("signout", []) => {
            session.sign_out().await?;
            println!("signed out");
        }
        ("signup", [username, password, firstname, lastname]) => {
            session.sign_up(username, password, firstname, lastname).await?;
            println!("account {} created, sign in to continue", username);
        }
        ("courses", rest) if rest.len() <= 1 => {
            let courses = match rest.first() {
                Some(query) => client.courses().search(Some(query.as_str()), None).await?,
                None => client.courses().get_all().await?,
            };
            for course in courses {
                let privacy = if course.is_private { "private" } else { "public" };
                println!("{}\t{}\t{}\t{}", course.course_code, course.course_name, privacy, course.created_by);
            }
        }
        ("assignments", codes) if !codes.is_empty() => {
            let results = client.workflows().assignments_by_course(codes).await;
            for code in codes {
                match results.get(code) {
                    Some(Ok(assignments)) => {
                        for a in assignments {
                            println!("{}\t{}\t{}\t{}%", code, a.name, a.due, a.weight);
                        }
                    }
                    Some(Err(e)) => println!("{}\terror: {}", code, e.user_message()),
                    None => {}
                }
            }
        }
        _ => {
            return Err(ApiError::Validation(USAGE.to_string()));
        }
    }

    Ok(())
}
