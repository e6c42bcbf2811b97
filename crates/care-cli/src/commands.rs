//! Command handlers for CLI subcommands.

use serde::Serialize;
use tracing::info;

use care_models::{Event, Item, UserId, WorkOrder};
use care_phones::OwnerPhone;
use care_workorders::{ItemEdit, NewItem, StatusChange, WorkOrderFilter};

use crate::cli::{AddItem, Commands, CreateOrder, OrderCommand, OutputFormat, PhoneCommand};
use crate::config::Services;

/// Result type for command operations.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// An order together with its items.
#[derive(Debug, Serialize)]
struct OrderView {
    #[serde(flatten)]
    order: WorkOrder,
    items: Vec<Item>,
}

/// Execute a CLI command.
pub fn execute(
    command: Commands,
    services: &Services,
    actor: Option<UserId>,
    format: OutputFormat,
) -> Result<()> {
    match command {
        Commands::Order(cmd) => execute_order(cmd, services, actor, format),
        Commands::Phone(cmd) => execute_phone(cmd, services, format),
    }
}

fn execute_order(
    command: OrderCommand,
    services: &Services,
    actor: Option<UserId>,
    format: OutputFormat,
) -> Result<()> {
    let machine = &services.machine;

    match command {
        OrderCommand::Create(create) => {
            let order = cmd_create(services, create, require_actor(actor)?)?;
            emit(format, &order, || print_order(&order))
        }
        OrderCommand::Show { id } => {
            let view = OrderView {
                order: machine.get(id)?,
                items: machine.items(id)?,
            };
            emit(format, &view, || {
                print_order(&view.order);
                print_items(&view.items);
            })
        }
        OrderCommand::List {
            organization,
            customer,
            status,
            priority,
            open,
        } => {
            let mut filter = WorkOrderFilter::new();
            if let Some(id) = organization {
                filter = filter.with_organization(id);
            }
            if let Some(id) = customer {
                filter = filter.with_customer(id);
            }
            if let Some(status) = status {
                filter = filter.with_status(status);
            }
            if let Some(priority) = priority {
                filter = filter.with_priority(priority);
            }
            if open {
                filter = filter.open_only();
            }

            let orders = machine.list(&filter)?;
            emit(format, &orders, || print_order_table(&orders))
        }
        OrderCommand::Transition {
            id,
            status,
            message,
        } => {
            let order = machine.transition_named(id, &status, require_actor(actor)?, message)?;
            emit(format, &order, || print_order(&order))
        }
        OrderCommand::Items { id } => {
            let items = machine.items(id)?;
            emit(format, &items, || print_items(&items))
        }
        OrderCommand::AddItem(add) => {
            let id = add.id;
            let edit = ItemEdit::Add(new_item(add));
            let mutation = machine.mutate_items(id, &[edit], require_actor(actor)?)?;
            emit(format, &mutation, || {
                print_items(&mutation.items);
                print_totals(&mutation.order);
            })
        }
        OrderCommand::RemoveItem { id, item } => {
            let edit = ItemEdit::Remove { id: item };
            let mutation = machine.mutate_items(id, &[edit], require_actor(actor)?)?;
            emit(format, &mutation, || {
                print_items(&mutation.items);
                print_totals(&mutation.order);
            })
        }
        OrderCommand::Events { id, history } => {
            if history {
                let changes = services.trail.replay(id)?;
                emit(format, &changes, || print_history(&changes))
            } else {
                let events = services.trail.list_by_order(id)?;
                emit(format, &events, || print_events(&events))
            }
        }
        OrderCommand::Note { id, message } => {
            let event = services.trail.append_note(id, &message, actor)?;
            emit(format, &event, || println!("Added note {}", event.id))
        }
    }
}

fn execute_phone(command: PhoneCommand, services: &Services, format: OutputFormat) -> Result<()> {
    let phones = &services.phones;

    match command {
        PhoneCommand::Add {
            owner,
            country_code,
            national_number,
            primary,
        } => {
            let entry = phones.associate_number(owner, &country_code, &national_number, primary)?;
            emit(format, &entry, || print_phones(std::slice::from_ref(&entry)))
        }
        PhoneCommand::List { owner } => {
            let entries = phones.list_for_owner(owner)?;
            emit(format, &entries, || print_phones(&entries))
        }
        PhoneCommand::Primary { owner, phone } => {
            let entry = phones.set_primary(owner, phone)?;
            emit(format, &entry, || print_phones(std::slice::from_ref(&entry)))
        }
        PhoneCommand::Remove { owner, phone } => {
            phones.dissociate(owner, phone)?;
            info!(owner = %owner, phone_number_id = %phone, "Removed phone link");
            match format {
                OutputFormat::Json => println!("{}", serde_json::json!({ "removed": phone })),
                OutputFormat::Text => println!("Removed {} from {}", phone, owner),
            }
            Ok(())
        }
    }
}

fn cmd_create(services: &Services, create: CreateOrder, actor: UserId) -> Result<WorkOrder> {
    let mut builder = care_models::NewWorkOrder::builder(
        create.organization,
        create.customer,
        create.vehicle,
        create.title,
    )
    .priority(create.priority);
    if let Some(description) = create.description {
        builder = builder.description(description);
    }
    if let Some(project) = create.project {
        builder = builder.project(project);
    }

    Ok(services.machine.create(builder.build(), actor)?)
}

fn new_item(add: AddItem) -> NewItem {
    let mut item = NewItem::new(add.item_type, add.name, add.qty, add.price).with_tax_rate(add.tax);
    if let Some(sku) = add.sku {
        item = item.with_sku(sku);
    }
    if let Some(position) = add.position {
        item = item.with_position(position);
    }
    item
}

fn require_actor(actor: Option<UserId>) -> Result<UserId> {
    actor.ok_or_else(|| "this command needs an actor (--actor or CARE_ACTOR)".into())
}

/// Prints `value` as JSON, or runs `text` for the human-readable form.
fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce()) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => text(),
    }
    Ok(())
}

fn print_order(order: &WorkOrder) {
    println!("Work order {} [{}]", order.id, order.status);
    println!("  Title:    {}", order.title);
    if let Some(description) = &order.description {
        println!("  Details:  {}", description);
    }
    println!("  Priority: {}", order.priority);
    println!("  Customer: {}", order.customer_id);
    println!("  Vehicle:  {}", order.vehicle_id);
    println!("  Opened:   {}", order.opened_at.format("%Y-%m-%d %H:%M:%S"));
    let stamps = [
        ("Scheduled", order.scheduled_at),
        ("Started", order.started_at),
        ("Completed", order.completed_at),
        ("Closed", order.closed_at),
    ];
    for (label, at) in stamps {
        if let Some(at) = at {
            println!("  {:<9} {}", format!("{}:", label), at.format("%Y-%m-%d %H:%M:%S"));
        }
    }
    print_totals(order);
}

fn print_totals(order: &WorkOrder) {
    println!(
        "  Subtotal: {}  Tax: {}  Total: {}",
        cents(order.subtotal_cents),
        cents(order.tax_cents),
        cents(order.total_cents)
    );
}

fn print_order_table(orders: &[WorkOrder]) {
    if orders.is_empty() {
        println!("No work orders found.");
        return;
    }

    println!(
        "{:<36}  {:<13}  {:<8}  {:<30}  {:>12}",
        "ID", "STATUS", "PRIORITY", "TITLE", "TOTAL"
    );
    println!("{}", "-".repeat(107));
    for order in orders {
        println!(
            "{:<36}  {:<13}  {:<8}  {:<30}  {:>12}",
            order.id,
            order.status,
            order.priority,
            truncate(&order.title, 30),
            cents(order.total_cents)
        );
    }
}

fn print_items(items: &[Item]) {
    if items.is_empty() {
        println!("No items.");
        return;
    }

    for item in items {
        println!(
            "  {:>3}. {:<6} {:<30} {:>8} x {:>10}  tax {}%  ({})",
            item.position,
            item.item_type,
            truncate(&item.name, 30),
            item.qty,
            cents(item.unit_price_cents),
            item.tax_rate_pct,
            item.id
        );
    }
}

fn print_events(events: &[Event]) {
    if events.is_empty() {
        println!("No events.");
        return;
    }

    for event in events {
        let at = event.created_at.format("%Y-%m-%d %H:%M:%S");
        match (event.from_status, event.to_status) {
            (Some(from), Some(to)) => println!("{}  {} -> {}", at, from, to),
            _ => println!("{}  note", at),
        }
        if let Some(message) = &event.message {
            println!("    {}", message);
        }
    }
}

fn print_history(changes: &[StatusChange]) {
    for change in changes {
        let by = change.by.map(|id| id.to_string()).unwrap_or_default();
        println!(
            "{}  {:<13}  {}",
            change.entered_at.format("%Y-%m-%d %H:%M:%S"),
            change.status,
            by
        );
    }
}

fn print_phones(entries: &[OwnerPhone]) {
    if entries.is_empty() {
        println!("No phone numbers.");
        return;
    }

    for entry in entries {
        let marker = if entry.link.is_primary { "*" } else { " " };
        println!("{} {:<16}  {}", marker, entry.phone.e164, entry.phone.id);
    }
}

/// Formats cents as a decimal amount.
fn cents(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Truncate a string to max length, adding "..." if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::config::Config;
    use care_models::{CustomerId, OrganizationId, Owner, VehicleId, WorkOrderId};
    use clap::Parser;
    use tempfile::TempDir;

    fn run(services: &Services, actor: Option<UserId>, args: &[String]) -> Result<()> {
        let mut argv = vec!["care".to_string()];
        argv.extend_from_slice(args);
        let cli = Cli::parse_from(argv);
        execute(cli.command, services, actor, OutputFormat::Text)
    }

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_order_flow() {
        let dir = TempDir::new().unwrap();
        let services = Config::resolve(Some(dir.path().to_path_buf())).open().unwrap();
        let actor = Some(UserId::new());

        let org = OrganizationId::new().to_string();
        let customer = CustomerId::new().to_string();
        let vehicle = VehicleId::new().to_string();
        run(
            &services,
            actor,
            &args(&[
                "order", "create", "--organization", &org, "--customer", &customer,
                "--vehicle", &vehicle, "--title", "Brake job",
            ]),
        )
        .unwrap();

        let order = services.machine.list(&WorkOrderFilter::new()).unwrap().remove(0);
        let id = order.id.to_string();

        run(
            &services,
            actor,
            &args(&["order", "add-item", &id, "--name", "Pads", "--price", "2500", "--tax", "8"]),
        )
        .unwrap();
        run(&services, actor, &args(&["order", "transition", &id, "in_progress"])).unwrap();
        run(&services, actor, &args(&["order", "note", &id, "Customer waiting"])).unwrap();

        let order = services.machine.get(order.id).unwrap();
        assert_eq!(order.subtotal_cents, 2500);
        assert_eq!(order.tax_cents, 200);
        assert_eq!(order.total_cents, 2700);
        assert!(order.started_at.is_some());
        assert_eq!(services.trail.list_by_order(order.id).unwrap().len(), 2);
    }

    #[test]
    fn test_mutations_need_actor() {
        let dir = TempDir::new().unwrap();
        let services = Config::resolve(Some(dir.path().to_path_buf())).open().unwrap();
        let id = WorkOrderId::new().to_string();

        let err = run(&services, None, &args(&["order", "transition", &id, "new"])).unwrap_err();
        assert!(err.to_string().contains("actor"));
    }

    #[test]
    fn test_unknown_order_is_an_error() {
        let dir = TempDir::new().unwrap();
        let services = Config::resolve(Some(dir.path().to_path_buf())).open().unwrap();
        let id = WorkOrderId::new().to_string();

        assert!(run(&services, None, &args(&["order", "show", &id])).is_err());
    }

    #[test]
    fn test_phone_flow() {
        let dir = TempDir::new().unwrap();
        let services = Config::resolve(Some(dir.path().to_path_buf())).open().unwrap();
        let user = UserId::new();
        let owner = format!("user:{}", user);

        run(&services, None, &args(&["phone", "add", &owner, "+1", "(555) 123-4567", "--primary"]))
            .unwrap();
        run(&services, None, &args(&["phone", "add", &owner, "44", "20 7946 0958"])).unwrap();

        let entries = services.phones.list_for_owner(Owner::User(user)).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].phone.e164, "+15551234567");
        assert!(entries[0].link.is_primary);

        let second = entries[1].phone.id.to_string();
        run(&services, None, &args(&["phone", "primary", &owner, &second])).unwrap();
        run(&services, None, &args(&["phone", "remove", &owner, &second])).unwrap();

        let entries = services.phones.list_for_owner(Owner::User(user)).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].link.is_primary);
    }

    #[test]
    fn test_cents() {
        assert_eq!(cents(0), "0.00");
        assert_eq!(cents(2700), "27.00");
        assert_eq!(cents(5), "0.05");
        assert_eq!(cents(-1250), "-12.50");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
    }
}
