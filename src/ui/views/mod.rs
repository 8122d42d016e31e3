mod case_detail;
mod case_list;

pub use case_detail::CaseDetailView;
pub use case_list::CaseListView;
