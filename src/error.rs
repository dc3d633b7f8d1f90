/*!

Error reporting sinks.

The engine never aborts on malformed input. Every component receives a `&mut dyn ErrorSink`
and reports through it; callers decide whether an accumulated `nerrors` count is fatal.
Landmarks are opaque `file:line` strings attached to elements at parse time.

*/

use std::io::Write;

///Receiver of diagnostics. Implementations must count errors so that callers
///can check `nerrors` at the points where continuing makes no sense.
pub trait ErrorSink
{
	///Report an error without a source location.
	fn error(&mut self, message: &str);
	///Report an error against a landmark. An empty landmark reports like `error`.
	fn lerror(&mut self, landmark: &str, message: &str);
	///Report a warning. Warnings do not count towards `nerrors`.
	fn warning(&mut self, message: &str);
	///Number of errors reported so far.
	fn nerrors(&self) -> usize;
}

///Sink writing diagnostics to the standard error stream.
pub struct StderrSink
{
	errors: usize,
}

impl StderrSink
{
	pub fn new() -> StderrSink
	{
		StderrSink{ errors: 0 }
	}
}

impl Default for StderrSink
{
	fn default() -> StderrSink
	{
		StderrSink::new()
	}
}

impl ErrorSink for StderrSink
{
	fn error(&mut self, message: &str)
	{
		self.errors += 1;
		let _ = writeln!(std::io::stderr(), "{}", message);
	}
	fn lerror(&mut self, landmark: &str, message: &str)
	{
		self.errors += 1;
		if landmark.is_empty()
		{
			let _ = writeln!(std::io::stderr(), "{}", message);
		}
		else
		{
			let _ = writeln!(std::io::stderr(), "{}: {}", landmark, message);
		}
	}
	fn warning(&mut self, message: &str)
	{
		let _ = writeln!(std::io::stderr(), "warning: {}", message);
	}
	fn nerrors(&self) -> usize
	{
		self.errors
	}
}

///Sink that only counts, keeping the messages around for inspection. Used by tests.
pub struct SilentSink
{
	errors: usize,
	pub messages: Vec<String>,
	pub warnings: Vec<String>,
}

impl SilentSink
{
	pub fn new() -> SilentSink
	{
		SilentSink{ errors: 0, messages: vec![], warnings: vec![] }
	}
}

impl Default for SilentSink
{
	fn default() -> SilentSink
	{
		SilentSink::new()
	}
}

impl ErrorSink for SilentSink
{
	fn error(&mut self, message: &str)
	{
		self.errors += 1;
		self.messages.push(message.to_string());
	}
	fn lerror(&mut self, landmark: &str, message: &str)
	{
		self.errors += 1;
		if landmark.is_empty()
		{
			self.messages.push(message.to_string());
		}
		else
		{
			self.messages.push(format!("{}: {}", landmark, message));
		}
	}
	fn warning(&mut self, message: &str)
	{
		self.warnings.push(message.to_string());
	}
	fn nerrors(&self) -> usize
	{
		self.errors
	}
}
