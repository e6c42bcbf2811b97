//! Command-line interface definition using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

use care_models::{
    CustomerId, ItemId, ItemType, OrganizationId, Owner, PhoneNumberId, Priority, ProjectId,
    UserId, VehicleId, WorkOrderId, WorkOrderStatus,
};

/// Engine Care - work order and phone directory administration
#[derive(Parser, Debug)]
#[command(name = "care")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to state directory
    #[arg(short, long, env = "CARE_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// User the changes are recorded under
    #[arg(short, long, env = "CARE_ACTOR")]
    pub actor: Option<UserId>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Work orders, their items and their audit trail
    #[command(subcommand)]
    Order(OrderCommand),

    /// Phone numbers of users and customers
    #[command(subcommand)]
    Phone(PhoneCommand),
}

#[derive(Subcommand, Debug)]
pub enum OrderCommand {
    /// Open a draft work order
    Create(CreateOrder),

    /// Show an order with its items
    Show {
        id: WorkOrderId,
    },

    /// List orders, highest priority first
    List {
        #[arg(long)]
        organization: Option<OrganizationId>,

        #[arg(long)]
        customer: Option<CustomerId>,

        #[arg(long)]
        status: Option<WorkOrderStatus>,

        #[arg(long)]
        priority: Option<Priority>,

        /// Hide completed and canceled orders
        #[arg(long)]
        open: bool,
    },

    /// Move an order to another status
    Transition {
        id: WorkOrderId,

        /// Target status in snake_case, e.g. scheduled or in_progress
        status: String,

        /// Note stored on the transition event
        #[arg(short, long)]
        message: Option<String>,
    },

    /// List the items of an order
    Items {
        id: WorkOrderId,
    },

    /// Add a line item
    AddItem(AddItem),

    /// Remove a line item
    RemoveItem {
        id: WorkOrderId,
        item: ItemId,
    },

    /// Show the audit trail of an order
    Events {
        id: WorkOrderId,

        /// Show the reconstructed status history instead of raw events
        #[arg(long)]
        history: bool,
    },

    /// Attach a free-text note to an order
    Note {
        id: WorkOrderId,
        message: String,
    },
}

#[derive(Args, Debug)]
pub struct CreateOrder {
    #[arg(long)]
    pub organization: OrganizationId,

    #[arg(long)]
    pub customer: CustomerId,

    #[arg(long)]
    pub vehicle: VehicleId,

    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub project: Option<ProjectId>,

    #[arg(long, default_value = "normal")]
    pub priority: Priority,
}

#[derive(Args, Debug)]
pub struct AddItem {
    pub id: WorkOrderId,

    /// labor, part, fee or other
    #[arg(long = "type", default_value = "part")]
    pub item_type: ItemType,

    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = "1")]
    pub qty: Decimal,

    /// Unit price in cents
    #[arg(long)]
    pub price: i64,

    /// Tax rate in percent
    #[arg(long, default_value = "0")]
    pub tax: Decimal,

    #[arg(long)]
    pub sku: Option<String>,

    /// Defaults to after the last item
    #[arg(long)]
    pub position: Option<i32>,
}

#[derive(Subcommand, Debug)]
pub enum PhoneCommand {
    /// Link a phone number to an owner
    Add {
        /// user:<uuid> or customer:<uuid>
        #[arg(value_parser = parse_owner)]
        owner: Owner,

        /// Country calling code, with or without the leading +
        country_code: String,

        /// National number; spaces and punctuation are ignored
        national_number: String,

        /// Make this the owner's primary number
        #[arg(short, long)]
        primary: bool,
    },

    /// List an owner's phone numbers
    List {
        #[arg(value_parser = parse_owner)]
        owner: Owner,
    },

    /// Make a linked number the owner's primary one
    Primary {
        #[arg(value_parser = parse_owner)]
        owner: Owner,
        phone: PhoneNumberId,
    },

    /// Unlink a phone number from an owner
    Remove {
        #[arg(value_parser = parse_owner)]
        owner: Owner,
        phone: PhoneNumberId,
    },
}

/// Output format for command results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Parses `user:<uuid>` or `customer:<uuid>`.
pub fn parse_owner(value: &str) -> Result<Owner, String> {
    let (kind, id) = value
        .split_once(':')
        .ok_or_else(|| format!("expected user:<id> or customer:<id>, got '{}'", value))?;

    match kind.trim() {
        "user" => id
            .parse()
            .map(Owner::User)
            .map_err(|e| format!("invalid user id '{}': {}", id, e)),
        "customer" => id
            .parse()
            .map(Owner::Customer)
            .map_err(|e| format!("invalid customer id '{}': {}", id, e)),
        other => Err(format!("unknown owner kind '{}'", other)),
    }
}

impl Cli {
    /// Returns the log level based on verbosity.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_create() {
        let (org, customer, vehicle) = (OrganizationId::new(), CustomerId::new(), VehicleId::new());
        let cli = Cli::parse_from([
            "care".to_string(),
            "order".to_string(),
            "create".to_string(),
            format!("--organization={}", org),
            format!("--customer={}", customer),
            format!("--vehicle={}", vehicle),
            "--title=Brake job".to_string(),
        ]);
        match cli.command {
            Commands::Order(OrderCommand::Create(create)) => {
                assert_eq!(create.organization, org);
                assert_eq!(create.title, "Brake job");
                assert_eq!(create.priority, Priority::Normal);
            }
            other => panic!("Expected order create, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_add_item() {
        let id = WorkOrderId::new();
        let cli = Cli::parse_from([
            "care".to_string(),
            "order".to_string(),
            "add-item".to_string(),
            id.to_string(),
            "--type=labor".to_string(),
            "--name=Diagnosis".to_string(),
            "--qty=1.5".to_string(),
            "--price=12000".to_string(),
        ]);
        match cli.command {
            Commands::Order(OrderCommand::AddItem(add)) => {
                assert_eq!(add.id, id);
                assert_eq!(add.item_type, ItemType::Labor);
                assert_eq!(add.qty, Decimal::new(15, 1));
                assert_eq!(add.tax, Decimal::ZERO);
                assert!(add.position.is_none());
            }
            other => panic!("Expected order add-item, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_phone_add() {
        let user = UserId::new();
        let owner = format!("user:{}", user);
        let cli = Cli::parse_from(["care", "phone", "add", &owner, "+1", "555 123 4567", "--primary"]);
        match cli.command {
            Commands::Phone(PhoneCommand::Add {
                owner,
                national_number,
                primary,
                ..
            }) => {
                assert_eq!(owner, Owner::User(user));
                assert_eq!(national_number, "555 123 4567");
                assert!(primary);
            }
            other => panic!("Expected phone add, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_owner() {
        let customer = CustomerId::new();
        assert_eq!(
            parse_owner(&format!("customer:{}", customer)),
            Ok(Owner::Customer(customer))
        );
        assert!(parse_owner("vendor:123").is_err());
        assert!(parse_owner("user:not-a-uuid").is_err());
        assert!(parse_owner("no-colon").is_err());
    }

    #[test]
    fn test_cli_global_flags() {
        let id = WorkOrderId::new();
        let actor = UserId::new();
        let cli = Cli::parse_from([
            "care".to_string(),
            "-vv".to_string(),
            "--format=json".to_string(),
            format!("--actor={}", actor),
            "order".to_string(),
            "show".to_string(),
            id.to_string(),
        ]);
        assert_eq!(cli.log_level(), tracing::Level::DEBUG);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.actor, Some(actor));
    }

    #[test]
    fn test_cli_help() {
        Cli::command().debug_assert();
    }
}
