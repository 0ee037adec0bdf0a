//! Reference names of the Azure DevOps fields this tool reads and writes.

pub const WORK_ITEM_TYPE: &str = "System.WorkItemType";
pub const TITLE: &str = "System.Title";
pub const DESCRIPTION: &str = "System.Description";
pub const STATE: &str = "System.State";
pub const TAGS: &str = "System.Tags";
pub const ASSIGNED_TO: &str = "System.AssignedTo";
pub const CREATED_BY: &str = "System.CreatedBy";
pub const CREATED_DATE: &str = "System.CreatedDate";
pub const CHANGED_BY: &str = "System.ChangedBy";
pub const CHANGED_DATE: &str = "System.ChangedDate";
pub const AREA_PATH: &str = "System.AreaPath";
pub const ITERATION_PATH: &str = "System.IterationPath";

pub const ACCEPTANCE_CRITERIA: &str = "Microsoft.VSTS.Common.AcceptanceCriteria";
pub const ACTIVITY: &str = "Microsoft.VSTS.Common.Activity";
pub const STACK_RANK: &str = "Microsoft.VSTS.Common.StackRank";
pub const BACKLOG_PRIORITY: &str = "Microsoft.VSTS.Common.BacklogPriority";
pub const STORY_POINTS: &str = "Microsoft.VSTS.Scheduling.StoryPoints";
pub const ORIGINAL_ESTIMATE: &str = "Microsoft.VSTS.Scheduling.OriginalEstimate";
pub const REMAINING_WORK: &str = "Microsoft.VSTS.Scheduling.RemainingWork";

pub const EXTERNAL_DEPENDENCIES: &str = "Custom.ExternalDependencies";
pub const NON_FUNCTIONAL_REQUIREMENTS: &str = "Custom.NonFunctionalRequirements_MI";
pub const CMDB_APP_NAME: &str = "Custom.CMDBAppName";

pub const LINK_PARENT: &str = "System.LinkTypes.Hierarchy-Reverse";
pub const LINK_CHILD: &str = "System.LinkTypes.Hierarchy-Forward";

pub const DEFAULT_ACTIVITY: &str = "Development";
pub const UNASSIGNED: &str = "Unassigned";
