//! Command-line interface.
//!
//! Filters given with `--filter` and `--or-filter` form one chain in the order
//! they appear on the command line, so
//!
//! ```text
//! leadgrid list --filter company:contains:acme --or-filter stage:is:won --filter tags:is:vip
//! ```
//!
//! reads `((company contains acme) or (stage is won)) and (tags is vip)`.
//! Each `--group` adds a group whose `;`-separated conditions are OR'd.

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{ArgAction, ArgMatches, Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use leadgrid_seeker::{
    Conjunction, FieldKey, FilterCondition, FilterGroup, FilterSet, GroupId, LeadPatch, Milestone,
    SortRule, SortRules, ViewState,
};
use tracing::{debug, info};

use crate::board::Board;
use crate::config::SavedViews;
use crate::output::{render_fields, render_lead, render_rows, serialize_structured, OutputMode};
use crate::store::{FetchCriteria, JsonFileStore, LeadStore};

#[derive(Debug, Parser)]
#[command(name = "leadgrid", version, about = "Search, filter and sort a lead table")]
pub struct Cli {
    /// Lead data file
    #[arg(long, global = true, env = "LEADGRID_DATA", default_value = "leads.json")]
    pub data: PathBuf,

    /// Saved views file (YAML)
    #[arg(long, global = true, env = "LEADGRID_VIEWS")]
    pub views: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputMode::Auto)]
    pub output: OutputMode,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List leads through a view
    List(ListArgs),

    /// Show one lead with its pipeline progress
    Show { id: String },

    /// Create a lead
    Add {
        #[arg(long)]
        email: String,
        /// Field assignment, repeatable
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        assignments: Vec<String>,
    },

    /// Change fields of a lead
    Set {
        id: String,
        #[arg(required = true, value_name = "FIELD=VALUE")]
        assignments: Vec<String>,
    },

    /// Mark a pipeline milestone complete
    Stage {
        id: String,
        milestone: String,
        /// Clear the milestone instead
        #[arg(long)]
        undo: bool,
    },

    /// Soft-delete a lead
    Delete { id: String },

    /// List filterable fields and their operators
    Fields,

    /// List saved views
    Views,
}

#[derive(Debug, Default, Args)]
pub struct ListArgs {
    /// Start from a saved view
    #[arg(long)]
    pub view: Option<String>,

    /// Free-text search
    #[arg(short, long)]
    pub search: Option<String>,

    /// Condition joined with AND
    #[arg(long = "filter", value_name = "FIELD:OP[:VALUE]")]
    pub filter: Vec<String>,

    /// Condition joined with OR
    #[arg(long = "or-filter", value_name = "FIELD:OP[:VALUE]")]
    pub or_filter: Vec<String>,

    /// Group of OR'd conditions
    #[arg(long = "group", value_name = "EXPR;EXPR")]
    pub group: Vec<String>,

    /// Sort rule, repeatable; replaces the saved view's sorts
    #[arg(long = "sort", value_name = "FIELD[:asc|desc]")]
    pub sort: Vec<String>,

    #[arg(long)]
    pub limit: Option<usize>,

    /// Only fetch leads in this stage
    #[arg(long)]
    pub stage: Option<String>,

    /// Include soft-deleted leads
    #[arg(long)]
    pub deleted: bool,

    /// `--filter`/`--or-filter` values in command-line order.
    #[arg(skip)]
    pub chain: Vec<(Conjunction, String)>,
}

impl Cli {
    /// Parses `args`, keeping the relative order of `--filter` and
    /// `--or-filter`.
    pub fn try_parse_ordered<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Cli::command().try_get_matches_from(args)?;
        let mut cli = Cli::from_arg_matches(&matches)?;
        if let (Command::List(list), Some(("list", sub))) = (&mut cli.command, matches.subcommand())
        {
            list.chain = ordered_chain(sub);
        }
        Ok(cli)
    }
}

fn ordered_chain(matches: &ArgMatches) -> Vec<(Conjunction, String)> {
    let mut chain: Vec<(usize, Conjunction, String)> = Vec::new();
    for (id, conjunction) in [("filter", Conjunction::And), ("or_filter", Conjunction::Or)] {
        if let (Some(indices), Some(values)) =
            (matches.indices_of(id), matches.get_many::<String>(id))
        {
            chain.extend(
                indices
                    .zip(values)
                    .map(|(index, value)| (index, conjunction, value.clone())),
            );
        }
    }
    chain.sort_by_key(|(index, ..)| *index);
    chain
        .into_iter()
        .map(|(_, conjunction, value)| (conjunction, value))
        .collect()
}

impl ListArgs {
    /// The filter chain. Without recorded order, AND filters come first.
    fn filter_chain(&self) -> Vec<(Conjunction, String)> {
        if !self.chain.is_empty() {
            return self.chain.clone();
        }
        self.filter
            .iter()
            .map(|expr| (Conjunction::And, expr.clone()))
            .chain(self.or_filter.iter().map(|expr| (Conjunction::Or, expr.clone())))
            .collect()
    }

    /// Builds the view state: the saved view (if any) extended with the
    /// command-line search, filters, groups and sorts.
    pub fn view_state(&self, saved: Option<&SavedViews>) -> anyhow::Result<ViewState> {
        let mut view = match (&self.view, saved) {
            (Some(name), Some(saved)) => saved.view(name)?,
            (Some(_), None) => bail!("--view needs a views file (--views or LEADGRID_VIEWS)"),
            (None, _) => ViewState::new(),
        };

        if let Some(search) = &self.search {
            view.search = search.clone();
        }

        let mut filters = std::mem::take(&mut view.filters);
        for (conjunction, expr) in self.filter_chain() {
            let condition = FilterCondition::parse("", &expr)
                .with_context(|| format!("bad filter '{expr}'"))?
                .with_conjunction(conjunction);
            filters = filters.with_condition(condition);
        }
        for exprs in &self.group {
            filters = add_group(filters, exprs)?;
        }
        view.filters = filters;

        if !self.sort.is_empty() {
            view.sorts = self
                .sort
                .iter()
                .try_fold(SortRules::new(), |rules, expr| {
                    SortRule::parse(expr).map(|rule| rules.push(rule))
                })
                .context("bad sort rule")?;
        }
        Ok(view)
    }

    fn criteria(&self) -> FetchCriteria {
        let mut criteria = FetchCriteria::new();
        if self.deleted {
            criteria = criteria.include_deleted();
        }
        if let Some(stage) = &self.stage {
            criteria = criteria.stage(stage.clone());
        }
        criteria
    }
}

/// Adds a group of `;`-separated conditions under the first free `g{n}` id.
fn add_group(filters: FilterSet, exprs: &str) -> anyhow::Result<FilterSet> {
    let id = (1..)
        .map(|n| GroupId::new(format!("g{n}")))
        .find(|id| filters.groups().iter().all(|group| &group.id != id))
        .unwrap_or_default();

    let mut filters = filters.with_group(FilterGroup::new(id.clone()));
    for expr in exprs.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let condition = FilterCondition::parse("", expr)
            .with_context(|| format!("bad group condition '{expr}'"))?
            .with_conjunction(Conjunction::Or)
            .in_group(id.clone());
        filters = filters.with_condition(condition);
    }
    Ok(filters.collect_empty_groups())
}

fn parse_assignments(patch: LeadPatch, assignments: &[String]) -> anyhow::Result<LeadPatch> {
    assignments.iter().try_fold(patch, |patch, expr| {
        patch
            .assign_expr(expr)
            .with_context(|| format!("bad assignment '{expr}'"))
    })
}

// ============================================================================
// Execution
// ============================================================================

/// Runs `cli` and returns what it would print.
pub fn execute(cli: &Cli) -> anyhow::Result<String> {
    let mode = cli.output;
    let store = JsonFileStore::open(&cli.data);
    debug!(data = %cli.data.display(), "opened store");

    let output = match &cli.command {
        Command::List(list) => {
            let saved = load_views(cli)?;
            let view = list.view_state(saved.as_ref())?;
            let board = load_board(store, list.criteria())?;
            let mut rows = board.rows(&view);
            if let Some(limit) = list.limit {
                rows.truncate(limit);
            }
            info!(shown = rows.len(), total = board.leads().len(), "listed leads");
            render_rows(&rows, mode)?
        }
        Command::Show { id } => {
            let lead = store
                .resolve(id)
                .with_context(|| format!("failed to read {}", cli.data.display()))?;
            render_lead(&lead, mode)?
        }
        Command::Add { email, assignments } => {
            let patch = LeadPatch::new().set(FieldKey::Email, email.as_str())?;
            let patch = parse_assignments(patch, assignments)?;
            let mut board = load_board(store, FetchCriteria::new())?;
            render_lead(board.create(&patch)?, mode)?
        }
        Command::Set { id, assignments } => {
            let patch = parse_assignments(LeadPatch::new(), assignments)?;
            let mut board = load_board(store, FetchCriteria::new())?;
            render_lead(board.update(id, &patch)?, mode)?
        }
        Command::Stage {
            id,
            milestone,
            undo,
        } => {
            let milestone: Milestone = milestone.parse()?;
            let mut board = load_board(store, FetchCriteria::new())?;
            render_lead(board.set_milestone(id, milestone, !undo)?, mode)?
        }
        Command::Delete { id } => {
            let mut board = load_board(store, FetchCriteria::new())?;
            board.soft_delete(id)?;
            if mode.is_structured() {
                serialize_structured(&serde_json::json!({ "deleted": id }), mode)?
            } else {
                format!("deleted {id}\n")
            }
        }
        Command::Fields => render_fields(mode)?,
        Command::Views => {
            let names: Vec<String> = load_views(cli)?
                .map(|views| views.names().map(str::to_string).collect())
                .unwrap_or_default();
            if mode.is_structured() {
                serialize_structured(&names, mode)?
            } else {
                names.iter().map(|name| format!("{name}\n")).collect()
            }
        }
    };
    Ok(output)
}

/// Runs `cli`, writing its output to stdout.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let output = execute(&cli)?;
    print!("{output}");
    Ok(())
}

fn load_views(cli: &Cli) -> anyhow::Result<Option<SavedViews>> {
    cli.views
        .as_deref()
        .map(|path| {
            SavedViews::load(path).with_context(|| format!("failed to load views {}", path.display()))
        })
        .transpose()
}

fn load_board(store: JsonFileStore, criteria: FetchCriteria) -> anyhow::Result<Board<JsonFileStore>> {
    let path = store.path().to_path_buf();
    Board::load(store, criteria).with_context(|| format!("failed to load {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadgrid_seeker::{Dir, Operator};

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_ordered(std::iter::once("leadgrid").chain(args.iter().copied())).unwrap()
    }

    fn list_args(cli: Cli) -> ListArgs {
        match cli.command {
            Command::List(list) => list,
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn filter_order_is_preserved() {
        let list = list_args(parse(&[
            "list",
            "--or-filter",
            "stage:is:won",
            "--filter",
            "company:contains:acme",
            "--or-filter",
            "tags:is:vip",
        ]));
        assert_eq!(
            list.chain,
            [
                (Conjunction::Or, "stage:is:won".to_string()),
                (Conjunction::And, "company:contains:acme".to_string()),
                (Conjunction::Or, "tags:is:vip".to_string()),
            ]
        );
    }

    #[test]
    fn view_state_from_flags() {
        let list = list_args(parse(&[
            "list",
            "--search",
            "  Alice ",
            "--filter",
            "company:contains:acme",
            "--group",
            "source:is:referral; source:is:website",
            "--sort",
            "lead_score:desc",
            "--sort",
            "company",
        ]));
        let view = list.view_state(None).unwrap();

        assert_eq!(view.search, "  Alice ");
        assert_eq!(view.filters.ungrouped().count(), 1);
        let g1 = GroupId::from("g1");
        assert_eq!(view.filters.members(&g1).count(), 2);
        assert!(view
            .filters
            .members(&g1)
            .all(|c| c.conjunction == Conjunction::Or && c.operator == Operator::Is));
        assert_eq!(view.sorts.len(), 2);
        assert_eq!(view.sorts.rules()[0].direction, Dir::Desc);
    }

    #[test]
    fn saved_view_is_extended() {
        let saved = SavedViews::from_yaml(
            "views:\n  hot:\n    filters:\n      - { field: stage, operator: is, value: qualified }\n    groups:\n      - id: g1\n        conditions:\n          - { field: replied, operator: is, value: 'true' }\n",
        )
        .unwrap();
        let list = list_args(parse(&["list", "--view", "hot", "--group", "source:is:referral"]));
        let view = list.view_state(Some(&saved)).unwrap();

        assert_eq!(view.filters.ungrouped().count(), 1);
        // g1 is taken by the saved view
        assert_eq!(view.filters.groups().len(), 2);
        assert_eq!(view.filters.members(&GroupId::from("g2")).count(), 1);
    }

    #[test]
    fn view_without_views_file_is_an_error() {
        let list = list_args(parse(&["list", "--view", "hot"]));
        assert!(list.view_state(None).is_err());
    }

    #[test]
    fn bad_filter_expression_is_reported() {
        let list = list_args(parse(&["list", "--filter", "colour:is:red"]));
        let err = list.view_state(None).unwrap_err();
        assert!(format!("{err:#}").contains("unknown field 'colour'"));
    }

    #[test]
    fn global_options_after_subcommand() {
        let cli = parse(&["fields", "-o", "json", "-vv", "--data", "x.json"]);
        assert_eq!(cli.output, OutputMode::Json);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.data, PathBuf::from("x.json"));
    }

    #[test]
    fn plain_parse_keeps_and_filters_first() {
        let cli = Cli::try_parse_from(["leadgrid", "list", "--or-filter", "a", "--filter", "b"])
            .unwrap();
        let list = list_args(cli);
        assert!(list.chain.is_empty());
        assert_eq!(
            list.filter_chain(),
            [
                (Conjunction::And, "b".to_string()),
                (Conjunction::Or, "a".to_string()),
            ]
        );
    }
}
