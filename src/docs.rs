use crate::api::{
    child::{CreateChild, UpdateChild},
    coach::{CreateCoach, EmailAvailability, UpdateCoach},
    event::{CreateEvent, UpdateEvent},
    group::{CreateGroup, UpdateGroup},
    message::CreateMessage,
};
use crate::error::{ErrorBody, FieldError};
use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus, MarkAllPresent, MarkAttendance},
    child::Child,
    coach::Coach,
    event::Event,
    group::Group,
    message::Message,
    response::{
        AttendanceList, ChildList, CoachList, EventList, GroupList, MessageList, MessageResponse,
        Pagination,
    },
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Coachboard API",
        version = "0.1.0",
        description = r#"
## Kids' Coaching Club

Backend of the club dashboard: coaches, groups, children, events, the message
feed, and per-session attendance.

### 🔹 Key Features
- **Attendance**
  - List a date's attendance per group, mark one child, mark a whole group present
- **Groups & Children**
  - Group rosters and child profiles
- **Coaches**
  - Coach profiles with unique emails
- **Events & Messages**
  - Calendar entries and a broadcast or per-group message feed

### 📦 Response Format
- Lists: `{ message, data, pagination: { page, limit, total, totalPages } }`
- Errors: `{ message, status }`, with `errors: [{ field, message }]` on validation failures
"#,
    ),
    paths(
        crate::api::attendance::list_attendance,
        crate::api::attendance::mark_attendance,
        crate::api::attendance::mark_all_present,
        crate::api::attendance::child_history,

        crate::api::group::list_groups,
        crate::api::group::get_group,
        crate::api::group::create_group,
        crate::api::group::update_group,
        crate::api::group::delete_group,

        crate::api::child::list_children,
        crate::api::child::get_child,
        crate::api::child::create_child,
        crate::api::child::update_child,
        crate::api::child::delete_child,

        crate::api::coach::list_coaches,
        crate::api::coach::get_coach,
        crate::api::coach::email_available,
        crate::api::coach::create_coach,
        crate::api::coach::update_coach,
        crate::api::coach::delete_coach,

        crate::api::event::list_events,
        crate::api::event::get_event,
        crate::api::event::create_event,
        crate::api::event::update_event,
        crate::api::event::delete_event,

        crate::api::message::list_messages,
        crate::api::message::get_message,
        crate::api::message::create_message,
        crate::api::message::delete_message
    ),
    components(
        schemas(
            AttendanceStatus,
            AttendanceRecord,
            MarkAttendance,
            MarkAllPresent,
            AttendanceList,
            Group,
            CreateGroup,
            UpdateGroup,
            GroupList,
            Child,
            CreateChild,
            UpdateChild,
            ChildList,
            Coach,
            CreateCoach,
            UpdateCoach,
            EmailAvailability,
            CoachList,
            Event,
            CreateEvent,
            UpdateEvent,
            EventList,
            Message,
            CreateMessage,
            MessageList,
            Pagination,
            MessageResponse,
            ErrorBody,
            FieldError
        )
    ),
    tags(
        (name = "Attendance", description = "Attendance marking APIs"),
        (name = "Group", description = "Group management APIs"),
        (name = "Child", description = "Child management APIs"),
        (name = "Coach", description = "Coach management APIs"),
        (name = "Event", description = "Event calendar APIs"),
        (name = "Message", description = "Message feed APIs"),
    )
)]
pub struct ApiDoc;
