use anyhow::Result;
use prismchat_envoy::{ApiClient, ConversationController, LocalFile};
use prismchat_shared::{ChatMessage, ConversationSummary, Role, RouteMode};
use std::io::{self, Write};
use std::path::PathBuf;

type Controller = ConversationController<ApiClient>;

pub async fn single_message(
    controller: &Controller,
    text: String,
    images: Vec<PathBuf>,
    conversation_id: Option<String>,
) -> Result<()> {
    if let Some(id) = conversation_id {
        controller.select_conversation(&id).await;
    }

    let mut files = Vec::with_capacity(images.len());
    for path in images {
        files.push(LocalFile::read(&path).await?);
    }

    let before = controller.messages().len();
    if controller.send(&text, files).await {
        for message in controller.messages().iter().skip(before) {
            print_message(message);
        }
        if let Some(id) = controller.active_conversation_id() {
            println!("\n(conversation {})", id);
        }
    } else {
        eprintln!("Message was not sent.");
    }
    Ok(())
}

pub async fn list_conversations(controller: &Controller) -> Result<()> {
    let conversations = controller.refresh_conversations().await;
    print_conversations(&conversations);
    Ok(())
}

pub async fn show_conversation(controller: &Controller, id: &str) -> Result<()> {
    controller.select_conversation(id).await;
    let messages = controller.messages();
    if messages.is_empty() {
        println!("(no messages)");
    }
    for message in &messages {
        print_message(message);
    }
    Ok(())
}

pub async fn interactive_chat(controller: &Controller) -> Result<()> {
    println!("PrismChat started. Type /help for commands, /quit to exit.\n");
    print_route(controller.route());

    loop {
        let staged = controller.draft().files.len();
        if staged > 0 {
            print!("You [{} image(s)]: ", staged);
        } else {
            print!("You: ");
        }
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix('/') {
            let (name, arg) = command
                .split_once(char::is_whitespace)
                .map(|(n, a)| (n, a.trim()))
                .unwrap_or((command, ""));

            match name {
                "quit" | "exit" => {
                    println!("Goodbye!");
                    break;
                }
                "help" => print_help(),
                "new" => {
                    controller.new_chat();
                    controller.clear_draft();
                    println!("Started a new chat.\n");
                }
                "list" => {
                    let conversations = controller.refresh_conversations().await;
                    print_conversations(&conversations);
                }
                "open" if !arg.is_empty() => {
                    controller.select_conversation(arg).await;
                    println!("── {} ──", controller.title());
                    for message in controller.messages() {
                        print_message(&message);
                    }
                    println!();
                }
                "route" => match arg.parse::<RouteMode>() {
                    Ok(route) => {
                        controller.set_route(route);
                        print_route(route);
                    }
                    Err(e) => eprintln!("{}", e),
                },
                "attach" if !arg.is_empty() => match LocalFile::read(arg).await {
                    Ok(file) => {
                        let name = file.name.clone();
                        if controller.attach_file(file) {
                            println!("Attached {}", name);
                        } else {
                            eprintln!("Too many images staged for one message.");
                        }
                    }
                    Err(e) => eprintln!("{}", e),
                },
                _ => print_help(),
            }
            continue;
        }

        controller.set_draft_text(input);
        let before = controller.messages().len();

        println!();
        if controller.send_draft().await {
            for message in controller.messages().iter().skip(before + 1) {
                print_message(message);
            }
            println!();
        } else {
            eprintln!("Message was not sent. Your draft and staged images are kept.\n");
        }
    }

    Ok(())
}

fn print_message(message: &ChatMessage) {
    let who = match message.role {
        Role::User => "You",
        Role::Assistant => "PrismChat",
    };
    if !message.content.is_empty() {
        println!("{}: {}", who, message.content);
    }
    for image in &message.images {
        println!("{}: [image] {}", who, abbreviate(image));
    }
}

fn print_conversations(conversations: &[ConversationSummary]) {
    if conversations.is_empty() {
        println!("No conversations yet.");
        return;
    }
    for conversation in conversations {
        println!(
            "  {}  {}  ({})",
            conversation.id,
            conversation.title,
            conversation.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
}

fn print_route(route: RouteMode) {
    match route {
        RouteMode::Prismguard => println!("Route: prismguard (images and text are redacted server-side)\n"),
        RouteMode::Direct => println!("Route: direct\n"),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /new             Start a new chat");
    println!("  /list            List conversations");
    println!("  /open ID         Open a conversation");
    println!("  /route MODE      Switch route (direct | prismguard)");
    println!("  /attach PATH     Stage an image for the next message");
    println!("  /quit            Exit");
    println!();
}

// data: URLs are far too long for a terminal line
fn abbreviate(url: &str) -> String {
    if url.starts_with("data:") {
        let kind = url
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .unwrap_or("image");
        format!("<local {} preview>", kind)
    } else {
        url.to_string()
    }
}
